use std::fmt;
use std::mem;
use std::net::IpAddr;
use std::str::FromStr;

use super::{Error, Method};

/// One transport specification from a `Transport` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    profile: Profile,
    lower: Option<Lower>,
    parameters: Vec<Parameter>,
}

impl Transport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            profile: Profile::Avp,
            lower: None,
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub const fn with_lower_protocol(mut self, lower: Lower) -> Self {
        self.lower = Some(lower);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Add `parameter`, dropping any earlier parameter of the same kind.
    #[must_use]
    pub fn with_parameter_replaced(mut self, parameter: Parameter) -> Self {
        self.parameters
            .retain(|existing| mem::discriminant(existing) != mem::discriminant(&parameter));
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    #[must_use]
    pub const fn lower_protocol(&self) -> Option<&Lower> {
        self.lower.as_ref()
    }

    /// RTP over the control connection. Lower protocol defaults to UDP.
    #[must_use]
    pub fn is_tcp(&self) -> bool {
        self.lower == Some(Lower::Tcp)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    #[must_use]
    pub fn is_multicast(&self) -> bool {
        self.parameters()
            .any(|parameter| matches!(parameter, Parameter::Multicast))
    }

    #[must_use]
    pub fn destination(&self) -> Option<&IpAddr> {
        self.parameters().find_map(|parameter| match parameter {
            Parameter::Destination(ip_addr) => Some(ip_addr),
            _ => None,
        })
    }

    #[must_use]
    pub fn client_port(&self) -> Option<&Port> {
        self.parameters().find_map(|parameter| match parameter {
            Parameter::ClientPort(port) => Some(port),
            _ => None,
        })
    }

    #[must_use]
    pub fn server_port(&self) -> Option<&Port> {
        self.parameters().find_map(|parameter| match parameter {
            Parameter::ServerPort(port) => Some(port),
            _ => None,
        })
    }

    #[must_use]
    pub fn interleaved_channel(&self) -> Option<&Channel> {
        self.parameters().find_map(|parameter| match parameter {
            Parameter::Interleaved(channel) => Some(channel),
            _ => None,
        })
    }

    #[must_use]
    pub fn mode(&self) -> Option<Method> {
        self.parameters().find_map(|parameter| match parameter {
            Parameter::Mode(method) => Some(*method),
            _ => None,
        })
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.profile)?;
        if let Some(lower) = self.lower.as_ref() {
            write!(f, "/{lower}")?;
        }
        for parameter in &self.parameters {
            write!(f, ";{parameter}")?;
        }
        Ok(())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(';');
        let spec = parts.next().unwrap_or_default().trim();

        let mut spec_parts = spec.split('/');
        let profile = match (spec_parts.next(), spec_parts.next()) {
            (Some(protocol), Some(profile)) if protocol.eq_ignore_ascii_case("RTP") => {
                profile.parse::<Profile>()?
            }
            _ => {
                return Err(Error::TransportProtocolProfileMissing {
                    value: s.to_string(),
                })
            }
        };
        let lower = spec_parts.next().map(str::parse).transpose()?;

        let parameters = parts
            .map(str::trim)
            .filter(|parameter| !parameter.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            profile,
            lower,
            parameters,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Avp,
    Avpf,
    Savp,
    Savpf,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Avp => write!(f, "RTP/AVP"),
            Self::Avpf => write!(f, "RTP/AVPF"),
            Self::Savp => write!(f, "RTP/SAVP"),
            Self::Savpf => write!(f, "RTP/SAVPF"),
        }
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AVP" => Ok(Self::Avp),
            "AVPF" => Ok(Self::Avpf),
            "SAVP" => Ok(Self::Savp),
            "SAVPF" => Ok(Self::Savpf),
            _ => Err(Error::TransportProtocolProfileMissing {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lower {
    Tcp,
    Udp,
}

impl fmt::Display for Lower {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
        }
    }
}

impl FromStr for Lower {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("TCP") {
            Ok(Self::Tcp)
        } else if s.eq_ignore_ascii_case("UDP") {
            Ok(Self::Udp)
        } else {
            Err(Error::TransportLowerUnknown {
                value: s.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Unicast,
    Multicast,
    Destination(IpAddr),
    Source(String),
    Interleaved(Channel),
    Append,
    Ttl(u8),
    Layers(usize),
    Port(Port),
    ClientPort(Port),
    ServerPort(Port),
    Ssrc(String),
    Mode(Method),
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unicast => write!(f, "unicast"),
            Self::Multicast => write!(f, "multicast"),
            Self::Destination(host) => write!(f, "destination={host}"),
            Self::Source(host) => write!(f, "source={host}"),
            Self::Interleaved(channel) => write!(f, "interleaved={channel}"),
            Self::Append => write!(f, "append"),
            Self::Ttl(ttl) => write!(f, "ttl={ttl}"),
            Self::Layers(layers) => write!(f, "layers={layers}"),
            Self::Port(port) => write!(f, "port={port}"),
            Self::ClientPort(port) => write!(f, "client_port={port}"),
            Self::ServerPort(port) => write!(f, "server_port={port}"),
            Self::Ssrc(ssrc) => write!(f, "ssrc={ssrc}"),
            Self::Mode(method) => write!(f, "mode=\"{method}\""),
        }
    }
}

fn parse_value<T: FromStr>(var: &str, value: &str) -> Result<T, Error> {
    value
        .parse::<T>()
        .map_err(|_| Error::TransportParameterValueInvalid {
            var: var.to_string(),
            val: value.to_string(),
        })
}

impl FromStr for Parameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (var, value) = match s.split_once('=') {
            Some((var, value)) => (var.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };
        if var.is_empty() {
            return Err(Error::TransportParameterInvalid {
                parameter: s.to_string(),
            });
        }

        let value = || {
            value.ok_or_else(|| Error::TransportParameterValueMissing {
                var: var.to_string(),
            })
        };

        match var {
            "unicast" => Ok(Self::Unicast),
            "multicast" => Ok(Self::Multicast),
            "append" => Ok(Self::Append),
            "destination" => Ok(Self::Destination(parse_value(var, value()?)?)),
            "source" => Ok(Self::Source(value()?.to_string())),
            "interleaved" => Ok(Self::Interleaved(parse_value(var, value()?)?)),
            "ttl" => Ok(Self::Ttl(parse_value(var, value()?)?)),
            "layers" => Ok(Self::Layers(parse_value(var, value()?)?)),
            "port" => Ok(Self::Port(parse_value(var, value()?)?)),
            "client_port" => Ok(Self::ClientPort(parse_value(var, value()?)?)),
            "server_port" => Ok(Self::ServerPort(parse_value(var, value()?)?)),
            "ssrc" => Ok(Self::Ssrc(value()?.to_string())),
            "mode" => {
                let value = value()?;
                let unquoted = value.trim_matches('"');
                Method::from_name(unquoted)
                    .map(Self::Mode)
                    .ok_or_else(|| Error::TransportParameterValueInvalid {
                        var: var.to_string(),
                        val: value.to_string(),
                    })
            }
            _ => Err(Error::TransportParameterUnknown {
                var: var.to_string(),
            }),
        }
    }
}

/// Interleaved channel, or channel pair for RTP and RTCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Single(u8),
    Range(u8, u8),
}

impl Channel {
    #[must_use]
    pub const fn first(self) -> u8 {
        match self {
            Self::Single(channel) | Self::Range(channel, _) => channel,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Single(channel) => write!(f, "{channel}"),
            Self::Range(rtp, rtcp) => write!(f, "{rtp}-{rtcp}"),
        }
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::TransportChannelMalformed {
            value: s.to_string(),
        };
        match s.split_once('-') {
            Some((rtp, rtcp)) => Ok(Self::Range(
                rtp.parse().map_err(|_| malformed())?,
                rtcp.parse().map_err(|_| malformed())?,
            )),
            None => Ok(Self::Single(s.parse().map_err(|_| malformed())?)),
        }
    }
}

/// Port, or port pair for RTP and RTCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Single(u16),
    Range(u16, u16),
}

impl Port {
    #[must_use]
    pub const fn first(self) -> u16 {
        match self {
            Self::Single(port) | Self::Range(port, _) => port,
        }
    }

    /// RTCP port. A single port implies RTCP on the next one.
    #[must_use]
    pub const fn rtcp(self) -> Option<u16> {
        match self {
            Self::Single(port) => port.checked_add(1),
            Self::Range(_, port) => Some(port),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Single(port) => write!(f, "{port}"),
            Self::Range(rtp, rtcp) => write!(f, "{rtp}-{rtcp}"),
        }
    }
}

impl FromStr for Port {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::TransportPortMalformed {
            value: s.to_string(),
        };
        match s.split_once('-') {
            Some((rtp, rtcp)) => Ok(Self::Range(
                rtp.parse().map_err(|_| malformed())?,
                rtcp.parse().map_err(|_| malformed())?,
            )),
            None => Ok(Self::Single(s.parse().map_err(|_| malformed())?)),
        }
    }
}

#[cfg(test)]
mod tests {

    use std::net::IpAddr;

    use super::{Channel, Error, Lower, Method, Parameter, Port, Profile, Transport};

    #[test]
    fn parse_minimal() {
        assert_eq!("RTP/AVP".parse::<Transport>().unwrap(), Transport::new());
    }

    #[test]
    fn parse_profile_and_lower() {
        let transport = "RTP/SAVPF/tcp".parse::<Transport>().unwrap();
        assert_eq!(transport.profile(), Profile::Savpf);
        assert!(transport.is_tcp());
        assert_eq!(
            "RTP/AVP/UDP".parse::<Transport>().unwrap(),
            Transport::new().with_lower_protocol(Lower::Udp),
        );
    }

    #[test]
    fn parse_profile_missing() {
        assert!(matches!(
            "RAW/RAW/UDP".parse::<Transport>(),
            Err(Error::TransportProtocolProfileMissing { .. }),
        ));
        assert!(matches!(
            "RTP".parse::<Transport>(),
            Err(Error::TransportProtocolProfileMissing { .. }),
        ));
    }

    #[test]
    fn parse_lower_unknown() {
        assert!(matches!(
            "RTP/AVP/SCTP".parse::<Transport>(),
            Err(Error::TransportLowerUnknown { .. }),
        ));
    }

    #[test]
    fn parse_destination_missing_value() {
        assert!(matches!(
            "RTP/AVP/UDP;destination".parse::<Transport>(),
            Err(Error::TransportParameterValueMissing { .. }),
        ));
    }

    #[test]
    fn parse_destination_ip() {
        assert_eq!(
            "RTP/AVP/UDP;destination=127.0.0.1"
                .parse::<Transport>()
                .unwrap()
                .destination(),
            Some(&IpAddr::from([127, 0, 0, 1])),
        );
    }

    #[test]
    fn parse_interleaved() {
        let transport = "RTP/AVP/TCP;interleaved=8-9".parse::<Transport>().unwrap();
        assert_eq!(transport.interleaved_channel(), Some(&Channel::Range(8, 9)));
        assert!(matches!(
            "RTP/AVP/TCP;interleaved=x".parse::<Transport>(),
            Err(Error::TransportParameterValueInvalid { .. }),
        ));
    }

    #[test]
    fn parse_ports() {
        let transport = "RTP/AVP;unicast;client_port=5000-5001;server_port=6000"
            .parse::<Transport>()
            .unwrap();
        assert_eq!(transport.client_port(), Some(&Port::Range(5000, 5001)));
        assert_eq!(transport.server_port(), Some(&Port::Single(6000)));
        assert_eq!(Port::Single(6000).rtcp(), Some(6001));
        assert_eq!(Port::Single(u16::MAX).rtcp(), None);
    }

    #[test]
    fn parse_tolerates_whitespace_and_trailing_separator() {
        assert_eq!(
            " RTP/AVP ; unicast ;".parse::<Transport>().unwrap(),
            Transport::new().with_parameter(Parameter::Unicast),
        );
    }

    #[test]
    fn parse_unknown_parameter() {
        assert!(matches!(
            "RTP/AVP;foo=bar".parse::<Transport>(),
            Err(Error::TransportParameterUnknown { .. }),
        ));
    }

    #[test]
    fn parse_mode() {
        assert_eq!(
            "RTP/AVP;mode=\"PLAY\"".parse::<Transport>().unwrap().mode(),
            Some(Method::Play),
        );
        assert_eq!(
            "RTP/AVP;mode=record".parse::<Transport>().unwrap().mode(),
            Some(Method::Record),
        );
        assert!(matches!(
            "RTP/AVP;mode=UNKNOWN".parse::<Transport>(),
            Err(Error::TransportParameterValueInvalid { .. }),
        ));
    }

    #[test]
    fn parse_rfc2326_section_12_39_examples() {
        assert_eq!(
            "RTP/AVP;multicast;ttl=127;mode=\"PLAY\""
                .parse::<Transport>()
                .unwrap(),
            Transport::new()
                .with_parameter(Parameter::Multicast)
                .with_parameter(Parameter::Ttl(127))
                .with_parameter(Parameter::Mode(Method::Play)),
        );
        assert_eq!(
            "RTP/AVP;unicast;client_port=3456-3457;mode=\"PLAY\""
                .parse::<Transport>()
                .unwrap(),
            Transport::new()
                .with_parameter(Parameter::Unicast)
                .with_parameter(Parameter::ClientPort(Port::Range(3456, 3457)))
                .with_parameter(Parameter::Mode(Method::Play)),
        );
    }

    #[test]
    fn replace_parameter() {
        let transport = Transport::new()
            .with_parameter(Parameter::Interleaved(Channel::Range(0, 1)))
            .with_parameter_replaced(Parameter::Interleaved(Channel::Range(2, 3)));
        assert_eq!(transport.to_string(), "RTP/AVP;interleaved=2-3");
    }

    #[test]
    fn format_all_parameters() {
        assert_eq!(
            Transport::new()
                .with_lower_protocol(Lower::Tcp)
                .with_parameter(Parameter::Unicast)
                .with_parameter(Parameter::Destination([1, 2, 3, 4].into()))
                .with_parameter(Parameter::Interleaved(Channel::Range(12, 13)))
                .with_parameter(Parameter::Ttl(99))
                .with_parameter(Parameter::ClientPort(Port::Range(9, 10)))
                .with_parameter(Parameter::ServerPort(Port::Range(11, 12)))
                .with_parameter(Parameter::Ssrc("01234ABCDEF".to_string()))
                .with_parameter(Parameter::Mode(Method::Play))
                .to_string(),
            "RTP/AVP/TCP;unicast;destination=1.2.3.4;interleaved=12-13;ttl=99;client_port=9-10;server_port=11-12;ssrc=01234ABCDEF;mode=\"PLAY\"",
        );
    }
}
