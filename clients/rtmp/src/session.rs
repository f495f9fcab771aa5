use std::io::{self, Cursor, IoSlice};

use amf_formats::Value;
use rtmp_formats::{
    chunk::{
        OutgoingMessage, ReceivedMessage,
        consts::csid,
        reader::ChunkReader,
        writer::ChunkWriter,
    },
    commands::{
        CheckBandwidthCommand, ConnectCommandRequest, CreateStreamCommandRequest,
        DeleteStreamCommand, PublishCommand, RtmpC2SCommands, RtmpS2CCommands, StatusInfo,
        StreamKeyCommand,
        consts::{CONNECTION_TYPE_NONPRIVATE, PUBLISH_TYPE_LIVE, status_code, status_level},
        errors::CommandMessageError,
    },
    handshake::client::HandshakeClient,
    message::RtmpMessageType,
    protocol_control::{ProtocolControlMessage, SetPeerBandwidthLimitType},
    user_control::{UserControlEvent, errors::UserControlEventError},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    net::{TcpStream, lookup_host},
    time::timeout,
};
use tokio_util::{
    bytes::{Buf, Bytes, BytesMut},
    either::Either,
};
use utils::traits::{reader::ReadFrom, reader::ReadRemainingFrom, writer::WriteTo};

use crate::{
    config::RtmpClientConfig,
    errors::{RtmpClientError, RtmpClientResult},
    handler::{ConnectionState, DisconnectReason, SessionHandler},
    media::{
        self, AUDIO_PACKET_RAW, AUDIO_PACKET_SEQUENCE_HEADER, StreamMetadata,
        VIDEO_TAG_AVC_SEQUENCE_HEADER,
    },
    url::RtmpTarget,
};

/// Internal session states; the public projection collapses everything
/// between name resolution and NetStream.Publish.Start into Connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    WaitDns,
    WaitTcp,
    WaitS0,
    WaitS1,
    WaitS2,
    WaitFms,
    Ready,
}

impl SessionState {
    fn projection(&self) -> ConnectionState {
        match self {
            SessionState::Idle => ConnectionState::Disconnected,
            SessionState::Ready => ConnectionState::Connected,
            _ => ConnectionState::Connecting,
        }
    }
}

/// Peer bandwidth as negotiated by Set Peer Bandwidth messages. The first
/// message is always adopted as a hard limit; afterwards Hard always wins,
/// Soft only lowers the stored value, and Dynamic counts as Hard only while
/// a hard limit is in effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerBandwidth {
    value: u32,
    limit: Option<SetPeerBandwidthLimitType>,
}

impl PeerBandwidth {
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn limit(&self) -> Option<SetPeerBandwidthLimitType> {
        self.limit
    }

    pub fn apply(&mut self, size: u32, limit_type: SetPeerBandwidthLimitType) -> bool {
        let as_hard = self.limit.is_none()
            || limit_type == SetPeerBandwidthLimitType::Hard
            || (limit_type == SetPeerBandwidthLimitType::Dynamic
                && self.limit == Some(SetPeerBandwidthLimitType::Hard));
        if as_hard {
            self.value = size;
            self.limit = Some(SetPeerBandwidthLimitType::Hard);
            return true;
        }
        if limit_type == SetPeerBandwidthLimitType::Soft && size < self.value {
            self.value = size;
            self.limit = Some(SetPeerBandwidthLimitType::Soft);
            return true;
        }
        false
    }
}

#[derive(Debug)]
struct Transport<IO> {
    read_half: ReadHalf<IO>,
    write_half: WriteHalf<IO>,
}

/// An RTMP publishing session: TCP (or any byte stream with the same
/// contract), handshake, the connect/releaseStream/FCPublish/createStream/
/// publish dialogue, then media multiplexing with per-channel back-pressure.
///
/// All inbound traffic is handled from within `connect*`, `flush` and
/// `drive`; there are no background tasks. Fatal receive-path errors tear
/// the session down and surface on the connection-state callback before the
/// erring call returns.
pub struct PublishSession<IO = TcpStream> {
    transport: Option<Transport<IO>>,
    read_buffer: BytesMut,
    chunk_reader: ChunkReader,
    chunk_writer: ChunkWriter,
    handler: Box<dyn SessionHandler + Send>,
    config: RtmpClientConfig,
    target: Option<RtmpTarget>,
    state: SessionState,

    transaction_counter: u32,
    connect_transaction_id: Option<f64>,
    create_stream_transaction_id: Option<f64>,
    stream_id: u32,
    window_ack_size: u32,
    peer_bandwidth: PeerBandwidth,
    audio_tag: Option<u8>,
}

impl<IO: std::fmt::Debug> std::fmt::Debug for PublishSession<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishSession")
            .field("transport", &self.transport)
            .field("read_buffer", &self.read_buffer)
            .field("chunk_reader", &self.chunk_reader)
            .field("chunk_writer", &self.chunk_writer)
            .field("config", &self.config)
            .field("target", &self.target)
            .field("state", &self.state)
            .field("transaction_counter", &self.transaction_counter)
            .field("connect_transaction_id", &self.connect_transaction_id)
            .field(
                "create_stream_transaction_id",
                &self.create_stream_transaction_id,
            )
            .field("stream_id", &self.stream_id)
            .field("window_ack_size", &self.window_ack_size)
            .field("peer_bandwidth", &self.peer_bandwidth)
            .field("audio_tag", &self.audio_tag)
            .finish()
    }
}

impl PublishSession<TcpStream> {
    /// Resolves, connects and publishes to `rtmp[s]://host[:port]/app/key`
    /// over plain TCP. Returns once NetStream.Publish.Start arrived.
    pub async fn connect(
        url: &str,
        config: RtmpClientConfig,
        handler: Box<dyn SessionHandler + Send>,
    ) -> RtmpClientResult<Self> {
        let mut session = Self::new(config, handler);
        let result = session.connect_tcp(url).await;
        session.settle(result).await?;
        Ok(session)
    }

    async fn connect_tcp(&mut self, url: &str) -> RtmpClientResult<()> {
        if self.state != SessionState::Idle {
            return Err(RtmpClientError::AlreadyConnected);
        }
        let target = RtmpTarget::parse(url)?;
        let (host, port) = (target.host.clone(), target.port);
        self.target = Some(target);

        self.set_state(SessionState::WaitDns);
        let mut addrs = timeout(self.config.dns_timeout, lookup_host((host.as_str(), port)))
            .await
            .map_err(|_| RtmpClientError::Timeout("name resolution"))??;
        let addr = addrs.next().ok_or_else(|| {
            RtmpClientError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", host),
            ))
        })?;

        self.set_state(SessionState::WaitTcp);
        let stream = timeout(self.config.io_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| RtmpClientError::Timeout("tcp connect"))??;
        self.handler.socket_connected();

        self.attach(stream).await
    }
}

impl<IO> PublishSession<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(config: RtmpClientConfig, handler: Box<dyn SessionHandler + Send>) -> Self {
        let queue_capacity = config.queue_capacity;
        Self {
            transport: None,
            read_buffer: BytesMut::with_capacity(4096),
            chunk_reader: ChunkReader::new(),
            chunk_writer: ChunkWriter::with_queue_capacity(queue_capacity),
            handler,
            config,
            target: None,
            state: SessionState::Idle,
            transaction_counter: 0,
            connect_transaction_id: None,
            create_stream_transaction_id: None,
            stream_id: 0,
            window_ack_size: 0,
            peer_bandwidth: PeerBandwidth::default(),
            audio_tag: None,
        }
    }

    /// Publishes over a caller-established byte stream (a TLS wrapper, a
    /// proxy tunnel); the url decides app, key and tcUrl only.
    pub async fn connect_io(
        io: IO,
        url: &str,
        config: RtmpClientConfig,
        handler: Box<dyn SessionHandler + Send>,
    ) -> RtmpClientResult<PublishSession<IO>> {
        let mut session = PublishSession::new(config, handler);
        let result = async {
            session.target = Some(RtmpTarget::parse(url)?);
            session.attach(io).await
        }
        .await;
        session.settle(result).await?;
        Ok(session)
    }

    pub fn state(&self) -> ConnectionState {
        self.state.projection()
    }

    /// Queues the `onMetaData` frame (with its `@setDataFrame` prefix).
    /// Like every send, the return value is how many messages were already
    /// waiting on the channel.
    pub fn send_metadata(&mut self, metadata: &StreamMetadata) -> RtmpClientResult<usize> {
        self.ensure_ready()?;
        let data_header = media::set_data_frame_header()?;
        let payload = media::metadata_payload(metadata)?;
        self.enqueue_media(
            RtmpMessageType::AMF0Data,
            0,
            Some(data_header),
            Bytes::from(payload),
            true,
        )
    }

    /// Queues the H.264 decoder configuration record.
    pub fn send_video_avcc(&mut self, avcc: Bytes) -> RtmpClientResult<usize> {
        self.ensure_ready()?;
        self.enqueue_media(
            RtmpMessageType::Video,
            0,
            Some(VIDEO_TAG_AVC_SEQUENCE_HEADER.to_vec()),
            avcc,
            false,
        )
    }

    /// Queues one AVCC video frame; the key-frame bit is derived from the
    /// payload itself.
    pub fn send_video_frame(&mut self, frame: Bytes, timestamp: u32) -> RtmpClientResult<usize> {
        self.ensure_ready()?;
        let data_header = media::video_frame_tag(&frame).to_vec();
        self.enqueue_media(
            RtmpMessageType::Video,
            timestamp,
            Some(data_header),
            frame,
            false,
        )
    }

    /// Queues the AAC AudioSpecificConfig and derives the audio tag byte
    /// reused by every later audio message.
    pub fn send_audio_specific_config(&mut self, asc: Bytes) -> RtmpClientResult<usize> {
        self.ensure_ready()?;
        let tag = media::audio_tag_byte(&asc)?;
        self.audio_tag = Some(tag);
        self.enqueue_media(
            RtmpMessageType::Audio,
            0,
            Some(vec![tag, AUDIO_PACKET_SEQUENCE_HEADER]),
            asc,
            false,
        )
    }

    /// Queues one raw AAC frame; the configuration must have been sent
    /// first.
    pub fn send_audio_data(&mut self, data: Bytes, timestamp: u32) -> RtmpClientResult<usize> {
        self.ensure_ready()?;
        let tag = self.audio_tag.ok_or(RtmpClientError::AudioConfigMissing)?;
        self.enqueue_media(
            RtmpMessageType::Audio,
            timestamp,
            Some(vec![tag, AUDIO_PACKET_RAW]),
            data,
            false,
        )
    }

    /// Drains the transmit queues to the socket, processing whatever the
    /// server sends in the meantime (acks, pings, chunk size changes).
    pub async fn flush(&mut self) -> RtmpClientResult<()> {
        let result = self.flush_inner().await;
        self.settle(result).await
    }

    /// Waits for one inbound read event and handles it. Useful when idle;
    /// during normal publishing `flush` already services the read side.
    pub async fn drive(&mut self) -> RtmpClientResult<()> {
        let result = self.drive_inner().await;
        self.settle(result).await
    }

    /// Ends the session: deleteStream when publishing, then teardown. Any
    /// still-queued payloads are handed back through `message_released`.
    pub async fn disconnect(&mut self) -> RtmpClientResult<()> {
        if self.state == SessionState::Idle {
            return Ok(());
        }
        if self.state == SessionState::Ready {
            let transaction_id = self.next_transaction();
            let stream_id = self.stream_id as f64;
            let queued = self.enqueue_command(
                csid::COMMAND,
                0,
                RtmpC2SCommands::DeleteStream(DeleteStreamCommand {
                    transaction_id,
                    stream_id,
                }),
            );
            match queued {
                Ok(()) => {
                    if let Err(err) = self.flush_inner().await {
                        tracing::debug!("flush during disconnect failed: {}", err);
                    }
                }
                Err(err) => tracing::debug!("deleteStream not queued: {}", err),
            }
        }
        self.teardown(DisconnectReason::ClientRequest).await;
        Ok(())
    }

    // connection establishment

    async fn attach(&mut self, mut io: IO) -> RtmpClientResult<()> {
        let watchdog = self.config.io_timeout;

        self.set_state(SessionState::WaitS0);
        {
            let mut handshake = HandshakeClient::new(&mut io);
            timeout(watchdog, handshake.send_c0_c1())
                .await
                .map_err(|_| RtmpClientError::Timeout("handshake send"))??;
            timeout(watchdog, handshake.read_s0())
                .await
                .map_err(|_| RtmpClientError::Timeout("s0"))??;
            self.set_state(SessionState::WaitS1);
            timeout(watchdog, handshake.read_s1())
                .await
                .map_err(|_| RtmpClientError::Timeout("s1"))??;
            timeout(watchdog, handshake.send_c2())
                .await
                .map_err(|_| RtmpClientError::Timeout("c2 echo"))??;
            self.set_state(SessionState::WaitS2);
            timeout(watchdog, handshake.read_s2())
                .await
                .map_err(|_| RtmpClientError::Timeout("s2"))??;
        }

        let (read_half, write_half) = tokio::io::split(io);
        self.transport = Some(Transport {
            read_half,
            write_half,
        });

        self.set_state(SessionState::WaitFms);
        self.start_dialogue()?;
        self.run_dialogue().await
    }

    /// Queues the connect command and the SetChunkSize announcement that
    /// immediately follows it.
    fn start_dialogue(&mut self) -> RtmpClientResult<()> {
        let transaction_id = self.next_transaction();
        self.connect_transaction_id = Some(transaction_id);
        let target = self.target.as_ref().expect("target set before dialogue");
        let request = ConnectCommandRequest {
            transaction_id,
            app: target.app.clone(),
            connection_type: CONNECTION_TYPE_NONPRIVATE.to_string(),
            flash_version: self.config.flash_version.clone(),
            tc_url: target.tc_url(),
        };
        self.enqueue_command(csid::COMMAND, 0, RtmpC2SCommands::Connect(request))?;
        self.chunk_writer.send_set_chunk_size(self.config.chunk_size)?;
        Ok(())
    }

    /// Pushes queued commands and processes responses until the server
    /// reports NetStream.Publish.Start.
    async fn run_dialogue(&mut self) -> RtmpClientResult<()> {
        while self.state != SessionState::Ready {
            self.flush_inner().await?;
            self.read_some().await?;
            self.process_inbound()?;
        }
        Ok(())
    }

    // io plumbing

    async fn flush_inner(&mut self) -> RtmpClientResult<()> {
        loop {
            if !self.chunk_writer.has_pending() {
                return Ok(());
            }
            let Self {
                transport,
                chunk_writer,
                read_buffer,
                config,
                ..
            } = self;
            let transport = transport.as_mut().ok_or(RtmpClientError::NotReady)?;

            let event = {
                let slices = chunk_writer
                    .current_slices()?
                    .expect("queues are not empty");
                let io_slices = [
                    IoSlice::new(slices[0]),
                    IoSlice::new(slices[1]),
                    IoSlice::new(slices[2]),
                ];
                let io_event = async {
                    tokio::select! {
                        wrote = transport.write_half.write_vectored(&io_slices) => Either::Left(wrote),
                        received = transport.read_half.read_buf(read_buffer) => Either::Right(received),
                    }
                };
                timeout(config.io_timeout, io_event)
                    .await
                    .map_err(|_| RtmpClientError::Timeout("socket"))?
            };

            match event {
                Either::Left(wrote) => {
                    let wrote = wrote?;
                    if wrote == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "socket closed while flushing",
                        )
                        .into());
                    }
                    if let Some(done) = self.chunk_writer.consume(wrote) {
                        if !done.internal {
                            self.handler.message_released(done.payload);
                        }
                    }
                }
                Either::Right(received) => {
                    if received? == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::ConnectionReset,
                            "connection reset by peer",
                        )
                        .into());
                    }
                    self.process_inbound()?;
                }
            }
        }
    }

    async fn drive_inner(&mut self) -> RtmpClientResult<()> {
        self.read_some().await?;
        self.process_inbound()
    }

    async fn read_some(&mut self) -> RtmpClientResult<()> {
        let Self {
            transport,
            read_buffer,
            config,
            ..
        } = self;
        let transport = transport.as_mut().ok_or(RtmpClientError::NotReady)?;
        let received = timeout(
            config.io_timeout,
            transport.read_half.read_buf(read_buffer),
        )
        .await
        .map_err(|_| RtmpClientError::Timeout("server data"))??;
        if received == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )
            .into());
        }
        Ok(())
    }

    /// Parses every complete message sitting in the read buffer and
    /// dispatches it, settling the acknowledgement cadence chunk by chunk.
    fn process_inbound(&mut self) -> RtmpClientResult<()> {
        loop {
            let (message, consumed) = {
                let mut cursor = Cursor::new(&self.read_buffer[..]);
                let message = self.chunk_reader.read(&mut cursor)?;
                (message, cursor.position() as usize)
            };
            if consumed == 0 && message.is_none() {
                break;
            }
            self.read_buffer.advance(consumed);
            if let Some(message) = message {
                self.dispatch_message(message)?;
            }
            // per chunk, not per batch: one readable event can cross the
            // half-window threshold several times, each crossing owes an Ack
            self.settle_ack_cadence();
        }
        Ok(())
    }

    fn settle_ack_cadence(&mut self) {
        if let Some(sequence_number) = self.chunk_reader.ack_due(self.window_ack_size) {
            match self.chunk_writer.send_acknowledgement(sequence_number) {
                Ok(()) => self.chunk_reader.mark_acknowledged(),
                // the ack channel ring is full; the counter keeps running
                // and the ack goes out with a later batch
                Err(err) => tracing::debug!("acknowledgement deferred: {}", err),
            }
        }
    }

    // inbound dispatch

    fn dispatch_message(&mut self, message: ReceivedMessage) -> RtmpClientResult<()> {
        let Ok(message_type) = RtmpMessageType::try_from(message.message_type_id) else {
            tracing::debug!(
                "ignoring message of unknown type {} ({} bytes)",
                message.message_type_id,
                message.payload.len()
            );
            return Ok(());
        };
        match message_type {
            t if t.is_protocol_control() => {
                let control =
                    ProtocolControlMessage::read_remaining_from(t, &message.payload[..])?;
                self.handle_protocol_control(control)
            }
            RtmpMessageType::UserControl => {
                match UserControlEvent::read_from(&message.payload[..]) {
                    Ok(event) => self.handle_user_control(event),
                    // vendor and extension events are no concern of a
                    // publisher, only a malformed payload is fatal
                    Err(UserControlEventError::UnknownEventType(event_type)) => {
                        tracing::debug!("ignoring user control event type {}", event_type);
                        Ok(())
                    }
                    Err(err) => Err(err.into()),
                }
            }
            RtmpMessageType::AMF0Command => {
                let command = RtmpS2CCommands::read_from(&message.payload[..])?;
                self.handle_command(command)
            }
            _ => {
                tracing::trace!(
                    "ignoring inbound {:?} message ({} bytes)",
                    message_type,
                    message.payload.len()
                );
                Ok(())
            }
        }
    }

    fn handle_protocol_control(
        &mut self,
        control: ProtocolControlMessage,
    ) -> RtmpClientResult<()> {
        match control {
            ProtocolControlMessage::SetChunkSize(message) => {
                tracing::debug!("peer chunk size: {}", message.chunk_size);
                self.chunk_reader.set_chunk_size(message.chunk_size as usize);
                // the announced size is adopted for the transmit side too,
                // from the next message boundary on
                self.chunk_writer.set_chunk_size(message.chunk_size as usize);
            }
            ProtocolControlMessage::Abort(message) => {
                self.chunk_reader.abort(message.chunk_stream_id);
            }
            ProtocolControlMessage::Ack(message) => {
                tracing::trace!("peer acknowledged {} bytes", message.sequence_number);
            }
            ProtocolControlMessage::WindowAckSize(message) => {
                tracing::debug!("window acknowledgement size: {}", message.size);
                self.window_ack_size = message.size;
            }
            ProtocolControlMessage::SetPeerBandwidth(message) => {
                if self.peer_bandwidth.apply(message.size, message.limit_type) {
                    let bandwidth = self.peer_bandwidth.value();
                    tracing::debug!("peer bandwidth now {}", bandwidth);
                    self.handler.peer_bandwidth_changed(bandwidth);
                }
            }
        }
        Ok(())
    }

    fn handle_user_control(&mut self, event: UserControlEvent) -> RtmpClientResult<()> {
        match event {
            UserControlEvent::PingRequest { timestamp } => {
                self.chunk_writer
                    .send_user_control(UserControlEvent::PingResponse { timestamp })?;
            }
            other => tracing::trace!("user control event: {:?}", other),
        }
        Ok(())
    }

    fn handle_command(&mut self, command: RtmpS2CCommands) -> RtmpClientResult<()> {
        match command {
            RtmpS2CCommands::Result {
                transaction_id,
                arguments,
            } => self.handle_result(transaction_id, arguments),
            RtmpS2CCommands::Error { info, .. } => {
                let info = info.unwrap_or_default();
                Err(Self::rejection(info))
            }
            RtmpS2CCommands::OnStatus { info } => self.handle_status(info),
            RtmpS2CCommands::OnBwDone => {
                let transaction_id = self.next_transaction();
                self.enqueue_command(
                    csid::COMMAND,
                    0,
                    RtmpC2SCommands::CheckBandwidth(CheckBandwidthCommand { transaction_id }),
                )
            }
            RtmpS2CCommands::Close => Err(RtmpClientError::ServerClose),
            RtmpS2CCommands::Unhandled { command_name } => {
                tracing::debug!("ignoring server command {}", command_name);
                Ok(())
            }
        }
    }

    fn handle_result(
        &mut self,
        transaction_id: f64,
        arguments: Vec<Value>,
    ) -> RtmpClientResult<()> {
        if self.connect_transaction_id == Some(transaction_id) {
            self.connect_transaction_id = None;
            let key = self.target.as_ref().expect("target set").key.clone();
            let release_id = self.next_transaction();
            self.enqueue_command(
                csid::COMMAND,
                0,
                RtmpC2SCommands::ReleaseStream(StreamKeyCommand {
                    transaction_id: release_id,
                    stream_key: key.clone(),
                }),
            )?;
            let fc_publish_id = self.next_transaction();
            self.enqueue_command(
                csid::COMMAND,
                0,
                RtmpC2SCommands::FcPublish(StreamKeyCommand {
                    transaction_id: fc_publish_id,
                    stream_key: key,
                }),
            )?;
            let create_id = self.next_transaction();
            self.create_stream_transaction_id = Some(create_id);
            self.enqueue_command(
                csid::COMMAND,
                0,
                RtmpC2SCommands::CreateStream(CreateStreamCommandRequest {
                    transaction_id: create_id,
                }),
            )
        } else if self.create_stream_transaction_id == Some(transaction_id) {
            self.create_stream_transaction_id = None;
            let stream_id =
                RtmpS2CCommands::result_stream_id(&arguments).ok_or_else(|| {
                    CommandMessageError::InvalidMessage(
                        "createStream result without a stream id".to_string(),
                    )
                })?;
            self.stream_id = stream_id as u32;
            tracing::debug!("publishing on message stream {}", self.stream_id);
            let transaction_id = self.next_transaction();
            let key = self.target.as_ref().expect("target set").key.clone();
            self.enqueue_command(
                csid::MEDIA,
                self.stream_id,
                RtmpC2SCommands::Publish(PublishCommand {
                    transaction_id,
                    stream_key: key,
                    publish_type: PUBLISH_TYPE_LIVE.to_string(),
                }),
            )
        } else {
            tracing::trace!("result for transaction {}", transaction_id);
            Ok(())
        }
    }

    fn handle_status(&mut self, info: StatusInfo) -> RtmpClientResult<()> {
        if info.code == status_code::PUBLISH_START {
            tracing::info!("publishing started: {}", info.description);
            self.set_state(SessionState::Ready);
            return Ok(());
        }
        if info.level == status_level::ERROR {
            return Err(Self::rejection(info));
        }
        tracing::debug!("status {} ({})", info.code, info.description);
        Ok(())
    }

    /// Maps a server status to a disconnect reason: the description text is
    /// matched first, then the code prefix.
    fn rejection(info: StatusInfo) -> RtmpClientError {
        let reason = if info
            .description
            .contains(status_code::NAME_IN_USE_DESCRIPTION)
        {
            DisconnectReason::AlreadyInUse
        } else if info.code.starts_with(status_code::CONNECT_REJECTED_PREFIX) {
            DisconnectReason::Refused
        } else {
            DisconnectReason::Unknown
        };
        RtmpClientError::ServerRejected {
            reason,
            code: info.code,
            description: info.description,
        }
    }

    // bookkeeping

    fn ensure_ready(&self) -> RtmpClientResult<()> {
        if self.state != SessionState::Ready {
            return Err(RtmpClientError::NotReady);
        }
        Ok(())
    }

    fn next_transaction(&mut self) -> f64 {
        self.transaction_counter += 1;
        self.transaction_counter as f64
    }

    fn enqueue_command(
        &mut self,
        chunk_stream_id: u32,
        message_stream_id: u32,
        command: RtmpC2SCommands,
    ) -> RtmpClientResult<()> {
        let mut payload = Vec::new();
        command.write_to(&mut payload)?;
        self.chunk_writer.enqueue(
            chunk_stream_id,
            OutgoingMessage {
                data_header: None,
                payload: Bytes::from(payload),
                message_type_id: RtmpMessageType::AMF0Command.into(),
                message_stream_id,
                timestamp: 0,
                internal: true,
                next_chunk_size: None,
            },
        )?;
        Ok(())
    }

    fn enqueue_media(
        &mut self,
        message_type: RtmpMessageType,
        timestamp: u32,
        data_header: Option<Vec<u8>>,
        payload: Bytes,
        internal: bool,
    ) -> RtmpClientResult<usize> {
        let ahead = self.chunk_writer.enqueue(
            csid::MEDIA,
            OutgoingMessage {
                data_header,
                payload,
                message_type_id: message_type.into(),
                message_stream_id: self.stream_id,
                timestamp,
                internal,
                next_chunk_size: None,
            },
        )?;
        Ok(ahead)
    }

    fn set_state(&mut self, next: SessionState) {
        let previous = self.state.projection();
        tracing::debug!("session state: {:?} -> {:?}", self.state, next);
        self.state = next;
        let current = self.state.projection();
        if previous != current && current != ConnectionState::Disconnected {
            self.handler.connection_state(current, None);
        }
    }

    /// Tears the session down after a failed call, mapping the error to the
    /// reason delivered on the connection-state callback.
    async fn settle<T>(&mut self, result: RtmpClientResult<T>) -> RtmpClientResult<T> {
        if let Err(err) = &result {
            if self.state != SessionState::Idle {
                tracing::error!("session failed: {}", err);
                self.teardown(err.disconnect_reason()).await;
            }
        }
        result
    }

    async fn teardown(&mut self, reason: DisconnectReason) {
        for done in self.chunk_writer.release_pending() {
            if !done.internal {
                self.handler.message_released(done.payload);
            }
        }
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.write_half.shutdown().await;
        }
        self.chunk_reader = ChunkReader::new();
        self.chunk_writer = ChunkWriter::with_queue_capacity(self.config.queue_capacity);
        self.read_buffer.clear();
        self.transaction_counter = 0;
        self.connect_transaction_id = None;
        self.create_stream_transaction_id = None;
        self.stream_id = 0;
        self.window_ack_size = 0;
        self.peer_bandwidth = PeerBandwidth::default();
        self.audio_tag = None;
        self.state = SessionState::Idle;
        self.handler
            .connection_state(ConnectionState::Disconnected, Some(reason));
    }
}
