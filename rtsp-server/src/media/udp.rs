use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use rtsp_protocol as rtsp;

use crate::media::{
    Caps, Destination, MediaError, MediaFactory, MessageTx, Pipeline, PipelineError,
    PipelineState, Stream, StreamInfo,
};

/// Factory for media described entirely by configuration. Its pipelines
/// send RTP to clients over UDP, or interleaved on the control connection.
pub struct UdpFactory {
    streams: Vec<StreamInfo>,
    bind_address: IpAddr,
}

impl UdpFactory {
    pub fn new(streams: Vec<StreamInfo>) -> Self {
        Self {
            streams,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }

    /// Address server side RTP and RTCP sockets bind to.
    pub fn with_bind_address(mut self, bind_address: IpAddr) -> Self {
        self.bind_address = bind_address;
        self
    }
}

impl MediaFactory for UdpFactory {
    fn streams(&self) -> Result<Vec<StreamInfo>, MediaError> {
        Ok(self.streams.clone())
    }

    fn build(&self, streams: &[Arc<Stream>]) -> Result<Box<dyn Pipeline>, PipelineError> {
        Ok(Box::new(UdpPipeline::new(streams.to_vec(), self.bind_address)))
    }
}

enum Sink {
    Udp {
        rtp: UdpSocket,
        // Held so the advertised RTCP port stays reserved.
        _rtcp: UdpSocket,
        client_rtp: SocketAddr,
    },
    Interleaved {
        sender: MessageTx,
        rtp_channel: rtsp::ChannelId,
    },
}

pub struct UdpPipeline {
    streams: Vec<Arc<Stream>>,
    sinks: Vec<Option<Sink>>,
    state: PipelineState,
    bind_address: IpAddr,
}

impl UdpPipeline {
    /// Attempts at finding an even RTP port with a free odd RTCP port next
    /// to it.
    const MAX_BIND_ATTEMPTS: usize = 16;

    pub fn new(streams: Vec<Arc<Stream>>, bind_address: IpAddr) -> Self {
        let sinks = streams.iter().map(|_| None).collect();
        Self {
            streams,
            sinks,
            state: PipelineState::Stopped,
            bind_address,
        }
    }

    fn grant_udp(
        &self,
        requested: &rtsp::Transport,
        destination: &Destination,
    ) -> Result<(Sink, rtsp::Transport), PipelineError> {
        let client_port = requested
            .client_port()
            .copied()
            .ok_or(PipelineError::TransportNotSupported {
                reason: "client_port missing",
            })?;
        if client_port.rtcp().is_none() {
            return Err(PipelineError::TransportNotSupported {
                reason: "client_port has no room for rtcp",
            });
        }

        let (rtp, rtcp) = bind_port_pair(self.bind_address)?;
        let server_port = rtsp::Port::Range(rtp.local_addr()?.port(), rtcp.local_addr()?.port());

        let granted = rtsp::Transport::new()
            .with_parameter(rtsp::Parameter::Unicast)
            .with_parameter(rtsp::Parameter::ClientPort(client_port))
            .with_parameter(rtsp::Parameter::ServerPort(server_port));
        let sink = Sink::Udp {
            rtp,
            _rtcp: rtcp,
            client_rtp: SocketAddr::new(destination.peer, client_port.first()),
        };
        Ok((sink, granted))
    }

    fn grant_interleaved(
        &self,
        stream_index: usize,
        requested: &rtsp::Transport,
        destination: &Destination,
    ) -> Result<(Sink, rtsp::Transport), PipelineError> {
        let sender = destination
            .sink
            .clone()
            .ok_or(PipelineError::TransportNotSupported {
                reason: "no connection to interleave on",
            })?;

        let out_of_channels = PipelineError::TransportNotSupported {
            reason: "interleaved channel out of range",
        };
        let (rtp_channel, rtcp_channel) = match requested.interleaved_channel().copied() {
            Some(rtsp::Channel::Range(rtp, rtcp)) => (rtp, rtcp),
            Some(rtsp::Channel::Single(rtp)) => (rtp, rtp.checked_add(1).ok_or(out_of_channels)?),
            None => {
                let rtp = stream_index
                    .checked_mul(2)
                    .and_then(|channel| u8::try_from(channel).ok())
                    .filter(|channel| *channel < u8::MAX)
                    .ok_or(out_of_channels)?;
                (rtp, rtp + 1)
            }
        };

        let granted = rtsp::Transport::new()
            .with_lower_protocol(rtsp::Lower::Tcp)
            .with_parameter(rtsp::Parameter::Unicast)
            .with_parameter(rtsp::Parameter::Interleaved(rtsp::Channel::Range(
                rtp_channel,
                rtcp_channel,
            )));
        let sink = Sink::Interleaved {
            sender,
            rtp_channel,
        };
        Ok((sink, granted))
    }
}

impl Pipeline for UdpPipeline {
    fn state(&self) -> PipelineState {
        self.state
    }

    fn set_state(&mut self, state: PipelineState) -> Result<(), PipelineError> {
        tracing::trace!(from = %self.state, to = %state, "pipeline state change");
        self.state = state;
        Ok(())
    }

    fn grant_transport(
        &mut self,
        stream_index: usize,
        requested: &rtsp::Transport,
        destination: &Destination,
    ) -> Result<rtsp::Transport, PipelineError> {
        if stream_index >= self.streams.len() {
            return Err(PipelineError::StreamNotFound {
                index: stream_index,
            });
        }
        if requested.profile() != rtsp::Profile::Avp {
            return Err(PipelineError::TransportNotSupported {
                reason: "only RTP/AVP is supported",
            });
        }
        if requested.is_multicast() {
            return Err(PipelineError::TransportNotSupported {
                reason: "multicast is not supported",
            });
        }

        let (sink, granted) = if requested.is_tcp() {
            self.grant_interleaved(stream_index, requested, destination)?
        } else {
            self.grant_udp(requested, destination)?
        };
        tracing::debug!(stream_index, %granted, "granted transport");
        self.sinks[stream_index] = Some(sink);
        Ok(granted)
    }

    fn release_transport(&mut self, stream_index: usize) {
        if let Some(sink) = self.sinks.get_mut(stream_index) {
            *sink = None;
        }
    }

    fn push(&mut self, stream_index: usize, payload: rtsp::Bytes) -> Result<(), PipelineError> {
        let stream = self
            .streams
            .get(stream_index)
            .ok_or(PipelineError::StreamNotFound {
                index: stream_index,
            })?;
        if stream.caps().is_none() {
            stream.set_caps(Caps::from(stream.info()));
        }

        if self.state != PipelineState::Playing {
            return Ok(());
        }

        match self.sinks[stream_index].as_ref() {
            Some(Sink::Udp {
                rtp, client_rtp, ..
            }) => {
                rtp.send_to(&payload, client_rtp)?;
            }
            Some(Sink::Interleaved {
                sender,
                rtp_channel,
            }) => {
                sender
                    .send(rtsp::Data::new(*rtp_channel, payload).into())
                    .map_err(|_| PipelineError::SinkClosed)?;
            }
            None => {}
        }
        Ok(())
    }
}

/// Bind an even RTP port and the odd RTCP port right after it.
fn bind_port_pair(ip: IpAddr) -> io::Result<(UdpSocket, UdpSocket)> {
    for _ in 0..UdpPipeline::MAX_BIND_ATTEMPTS {
        let rtp = UdpSocket::bind((ip, 0))?;
        let port = rtp.local_addr()?.port();
        if port % 2 != 0 {
            continue;
        }
        if let Ok(rtcp) = UdpSocket::bind((ip, port + 1)) {
            return Ok((rtp, rtcp));
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AddrInUse,
        "no free rtp/rtcp port pair",
    ))
}
