use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use utils::random::random_fill;

use super::{
    HandshakeClientState, RTMP_HANDSHAKE_SIZE, RTMP_VERSION,
    errors::{HandshakeError, HandshakeResult},
};

/// Plain (non-digest) client handshake: C0 is the version byte, C1 is
/// 8 zero bytes followed by 1528 random bytes, C2 echoes S1 unchanged and
/// S2 is read and discarded.
#[derive(Debug)]
pub struct HandshakeClient<'a, IO> {
    io: &'a mut IO,
    s1_bytes: Vec<u8>,
    state: HandshakeClientState,
}

impl<'a, IO> HandshakeClient<'a, IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: &'a mut IO) -> Self {
        Self {
            io,
            s1_bytes: Vec::with_capacity(RTMP_HANDSHAKE_SIZE),
            state: HandshakeClientState::Uninitialized,
        }
    }

    pub fn state(&self) -> HandshakeClientState {
        self.state
    }

    pub async fn handshake(&mut self) -> HandshakeResult<()> {
        loop {
            match self.state {
                HandshakeClientState::Uninitialized => {
                    self.send_c0_c1().await?;
                }
                HandshakeClientState::C0C1Sent => {
                    self.read_s0().await?;
                    self.read_s1().await?;
                }
                HandshakeClientState::S0S1Received => {
                    self.send_c2().await?;
                }
                HandshakeClientState::AckSent => {
                    self.read_s2().await?;
                }
                HandshakeClientState::Done => break,
            }
            tracing::trace!("handshake state: {:?}", self.state);
        }
        Ok(())
    }

    pub async fn send_c0_c1(&mut self) -> HandshakeResult<()> {
        self.io.write_u8(RTMP_VERSION).await?;
        let mut c1 = [0u8; RTMP_HANDSHAKE_SIZE];
        random_fill(&mut c1[8..]);
        self.io.write_all(&c1).await?;
        self.io.flush().await?;
        self.state = HandshakeClientState::C0C1Sent;
        Ok(())
    }

    pub async fn read_s0(&mut self) -> HandshakeResult<()> {
        let version = self.io.read_u8().await?;
        if version != RTMP_VERSION {
            return Err(HandshakeError::UnsupportedVersion(version));
        }
        Ok(())
    }

    pub async fn read_s1(&mut self) -> HandshakeResult<()> {
        self.s1_bytes.resize(RTMP_HANDSHAKE_SIZE, 0);
        self.io.read_exact(&mut self.s1_bytes).await?;
        self.state = HandshakeClientState::S0S1Received;
        Ok(())
    }

    /// C2 is the unmodified S1 echo; the peer validates it, we do not
    /// validate S2.
    pub async fn send_c2(&mut self) -> HandshakeResult<()> {
        self.io.write_all(&self.s1_bytes).await?;
        self.io.flush().await?;
        self.state = HandshakeClientState::AckSent;
        Ok(())
    }

    pub async fn read_s2(&mut self) -> HandshakeResult<()> {
        let mut s2 = [0u8; RTMP_HANDSHAKE_SIZE];
        self.io.read_exact(&mut s2).await?;
        self.state = HandshakeClientState::Done;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::{HandshakeClient, HandshakeError, RTMP_HANDSHAKE_SIZE, RTMP_VERSION};

    #[tokio::test]
    async fn echoes_s1_as_c2() {
        let (mut client_io, mut server_io) = tokio::io::duplex(4 * RTMP_HANDSHAKE_SIZE);

        let server = tokio::spawn(async move {
            let mut c0 = [0u8; 1];
            server_io.read_exact(&mut c0).await.unwrap();
            assert_eq!(c0[0], RTMP_VERSION);

            let mut c1 = vec![0u8; RTMP_HANDSHAKE_SIZE];
            server_io.read_exact(&mut c1).await.unwrap();
            assert_eq!(&c1[..8], &[0u8; 8]);

            let mut s1 = vec![0u8; RTMP_HANDSHAKE_SIZE];
            for (i, b) in s1.iter_mut().enumerate() {
                *b = (i % 251) as u8;
            }
            server_io.write_u8(RTMP_VERSION).await.unwrap();
            server_io.write_all(&s1).await.unwrap();
            // s2 echoes c1, which the client must ignore
            server_io.write_all(&c1).await.unwrap();

            let mut c2 = vec![0u8; RTMP_HANDSHAKE_SIZE];
            server_io.read_exact(&mut c2).await.unwrap();
            assert_eq!(c2, s1);
        });

        HandshakeClient::new(&mut client_io)
            .handshake()
            .await
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unknown_version() {
        let (mut client_io, mut server_io) = tokio::io::duplex(4 * RTMP_HANDSHAKE_SIZE);

        tokio::spawn(async move {
            let mut c0c1 = vec![0u8; 1 + RTMP_HANDSHAKE_SIZE];
            server_io.read_exact(&mut c0c1).await.unwrap();
            server_io.write_u8(6).await.unwrap();
            let s1 = vec![0u8; RTMP_HANDSHAKE_SIZE];
            server_io.write_all(&s1).await.unwrap();
        });

        let err = HandshakeClient::new(&mut client_io)
            .handshake()
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::UnsupportedVersion(6)));
    }
}
