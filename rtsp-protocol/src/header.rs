use std::collections::BTreeMap;
use std::fmt;

/// Known header fields. Headers that are not in this list are dropped by the
/// parser.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Header {
    Accept,
    AcceptEncoding,
    AcceptLanguage,
    Allow,
    Authorization,
    Bandwidth,
    Blocksize,
    CacheControl,
    Conference,
    Connection,
    ContentBase,
    ContentEncoding,
    ContentLanguage,
    ContentLength,
    ContentLocation,
    ContentType,
    CSeq,
    Date,
    Expires,
    From,
    IfModifiedSince,
    LastModified,
    ProxyAuthenticate,
    ProxyRequire,
    Public,
    Range,
    Referer,
    Require,
    RetryAfter,
    RtpInfo,
    Scale,
    Session,
    Server,
    Speed,
    Transport,
    Unsupported,
    UserAgent,
    Via,
    WwwAuthenticate,
    ClientChallenge,
    RealChallenge1,
    RealChallenge2,
    RealChallenge3,
    Subscribe,
    Alert,
    ClientId,
    CompanyId,
    Guid,
    RegionData,
    MaxAsmWidth,
    Language,
    PlayerStartTime,
    Location,
    ETag,
    IfMatch,
    Timestamp,
    AuthenticationInfo,
    Host,
    Pragma,
    XServerIpAddress,
    XSessionCookie,
    RtcpInterval,
    KeyMgmt,
    PipelinedRequests,
    MediaProperties,
    SeekStyle,
    AcceptRanges,
    Frames,
    RateControl,
}

struct HeaderInfo {
    header: Header,
    name: &'static str,
    multiple: bool,
}

const fn info(header: Header, name: &'static str, multiple: bool) -> HeaderInfo {
    HeaderInfo {
        header,
        name,
        multiple,
    }
}

// Indexed by `Header as usize`, keep in declaration order.
const HEADERS: [HeaderInfo; 69] = [
    info(Header::Accept, "Accept", true),
    info(Header::AcceptEncoding, "Accept-Encoding", true),
    info(Header::AcceptLanguage, "Accept-Language", true),
    info(Header::Allow, "Allow", true),
    info(Header::Authorization, "Authorization", false),
    info(Header::Bandwidth, "Bandwidth", false),
    info(Header::Blocksize, "Blocksize", false),
    info(Header::CacheControl, "Cache-Control", true),
    info(Header::Conference, "Conference", false),
    info(Header::Connection, "Connection", true),
    info(Header::ContentBase, "Content-Base", false),
    info(Header::ContentEncoding, "Content-Encoding", true),
    info(Header::ContentLanguage, "Content-Language", true),
    info(Header::ContentLength, "Content-Length", false),
    info(Header::ContentLocation, "Content-Location", false),
    info(Header::ContentType, "Content-Type", false),
    info(Header::CSeq, "CSeq", false),
    info(Header::Date, "Date", false),
    info(Header::Expires, "Expires", false),
    info(Header::From, "From", false),
    info(Header::IfModifiedSince, "If-Modified-Since", false),
    info(Header::LastModified, "Last-Modified", false),
    info(Header::ProxyAuthenticate, "Proxy-Authenticate", true),
    info(Header::ProxyRequire, "Proxy-Require", true),
    info(Header::Public, "Public", true),
    info(Header::Range, "Range", false),
    info(Header::Referer, "Referer", false),
    info(Header::Require, "Require", true),
    info(Header::RetryAfter, "Retry-After", false),
    info(Header::RtpInfo, "RTP-Info", true),
    info(Header::Scale, "Scale", false),
    info(Header::Session, "Session", false),
    info(Header::Server, "Server", false),
    info(Header::Speed, "Speed", false),
    info(Header::Transport, "Transport", true),
    info(Header::Unsupported, "Unsupported", true),
    info(Header::UserAgent, "User-Agent", false),
    info(Header::Via, "Via", true),
    info(Header::WwwAuthenticate, "WWW-Authenticate", true),
    info(Header::ClientChallenge, "ClientChallenge", false),
    info(Header::RealChallenge1, "RealChallenge1", false),
    info(Header::RealChallenge2, "RealChallenge2", false),
    info(Header::RealChallenge3, "RealChallenge3", false),
    info(Header::Subscribe, "Subscribe", false),
    info(Header::Alert, "Alert", false),
    info(Header::ClientId, "ClientID", false),
    info(Header::CompanyId, "CompanyID", false),
    info(Header::Guid, "GUID", false),
    info(Header::RegionData, "RegionData", false),
    info(Header::MaxAsmWidth, "SupportsMaximumASMBandwidth", false),
    info(Header::Language, "Language", false),
    info(Header::PlayerStartTime, "PlayerStarttime", false),
    info(Header::Location, "Location", false),
    info(Header::ETag, "ETag", false),
    info(Header::IfMatch, "If-Match", true),
    info(Header::Timestamp, "Timestamp", false),
    info(Header::AuthenticationInfo, "Authentication-Info", false),
    info(Header::Host, "Host", false),
    info(Header::Pragma, "Pragma", true),
    info(Header::XServerIpAddress, "X-Server-IP-Address", false),
    info(Header::XSessionCookie, "x-sessioncookie", false),
    info(Header::RtcpInterval, "RTCP-Interval", false),
    info(Header::KeyMgmt, "KeyMgmt", false),
    info(Header::PipelinedRequests, "Pipelined-Requests", false),
    info(Header::MediaProperties, "Media-Properties", false),
    info(Header::SeekStyle, "Seek-Style", false),
    info(Header::AcceptRanges, "Accept-Ranges", false),
    info(Header::Frames, "Frames", false),
    info(Header::RateControl, "Rate-Control", false),
];

impl Header {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        HEADERS[self as usize].name
    }

    /// Whether the header may appear more than once in a message (or carry
    /// a comma-separated list of values).
    #[must_use]
    pub const fn allows_multiple(self) -> bool {
        HEADERS[self as usize].multiple
    }

    /// Case-insensitive lookup of a header by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        HEADERS
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .map(|info| info.header)
    }

    /// Authentication challenges carry commas inside a single value, so their
    /// values are never split into lists.
    pub(crate) const fn splits_on_comma(self) -> bool {
        self.allows_multiple()
            && !matches!(self, Self::WwwAuthenticate | Self::ProxyAuthenticate)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header multimap.
///
/// Repeatable headers accumulate values in the order they are added; all
/// other headers hold exactly one value, the last one added.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Headers(BTreeMap<Header, Vec<String>>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Replace all values of `header` with `value`.
    pub fn insert(&mut self, header: Header, value: impl Into<String>) {
        self.0.insert(header, vec![value.into()]);
    }

    /// Add a value. Returns `true` if a previous value of a non-repeatable
    /// header was overwritten.
    pub fn append(&mut self, header: Header, value: impl Into<String>) -> bool {
        let values = self.0.entry(header).or_default();
        let overwritten = !header.allows_multiple() && !values.is_empty();
        if overwritten {
            values.clear();
        }
        values.push(value.into());
        overwritten
    }

    #[must_use]
    pub fn get(&self, header: Header) -> Option<&str> {
        self.0
            .get(&header)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_all(&self, header: Header) -> &[String] {
        self.0.get(&header).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, header: Header) -> bool {
        self.0.contains_key(&header)
    }

    pub fn remove(&mut self, header: Header) -> Option<Vec<String>> {
        self.0.remove(&header)
    }

    /// Number of distinct header fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all values, one item per value.
    pub fn iter(&self) -> impl Iterator<Item = (Header, &str)> {
        self.0.iter().flat_map(|(header, values)| {
            values.iter().map(move |value| (*header, value.as_str()))
        })
    }
}

impl<V: Into<String>> FromIterator<(Header, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (Header, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (header, value) in iter {
            headers.append(header, value);
        }
        headers
    }
}

/// Split a header value on commas that are not inside double quotes.
pub(crate) fn split_list(value: &str) -> impl Iterator<Item = &str> {
    let mut quoted = false;
    let mut start = 0;
    let mut parts = Vec::new();
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts.into_iter().map(str::trim).filter(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {

    use super::{split_list, Header, Headers, HEADERS};

    #[test]
    fn table_is_indexed_by_id() {
        for (i, info) in HEADERS.iter().enumerate() {
            assert_eq!(info.header as usize, i, "{} out of place", info.name);
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Header::from_name("cseq"), Some(Header::CSeq));
        assert_eq!(Header::from_name("CSEQ"), Some(Header::CSeq));
        assert_eq!(Header::from_name("rtp-info"), Some(Header::RtpInfo));
        assert_eq!(Header::from_name("X-Sessioncookie"), Some(Header::XSessionCookie));
        assert_eq!(Header::from_name("X-Custom"), None);
    }

    #[test]
    fn repeatable_flags() {
        assert!(Header::Via.allows_multiple());
        assert!(Header::Transport.allows_multiple());
        assert!(!Header::CSeq.allows_multiple());
        assert!(!Header::Session.allows_multiple());
        assert!(!Header::ContentLength.allows_multiple());
    }

    #[test]
    fn append_repeatable_keeps_order() {
        let mut headers = Headers::new();
        assert!(!headers.append(Header::Via, "a"));
        assert!(!headers.append(Header::Via, "b"));
        assert!(!headers.append(Header::Via, "c"));
        assert_eq!(headers.get_all(Header::Via), ["a", "b", "c"]);
        assert_eq!(headers.get(Header::Via), Some("a"));
    }

    // Duplicate non-repeatable headers keep the last value. This mirrors the
    // behavior on the wire and is deliberate.
    #[test]
    fn append_non_repeatable_last_wins() {
        let mut headers = Headers::new();
        assert!(!headers.append(Header::CSeq, "1"));
        assert!(headers.append(Header::CSeq, "2"));
        assert_eq!(headers.get_all(Header::CSeq), ["2"]);
    }

    #[test]
    fn insert_replaces_all_values() {
        let mut headers = Headers::new();
        headers.append(Header::Via, "a");
        headers.append(Header::Via, "b");
        headers.insert(Header::Via, "c");
        assert_eq!(headers.get_all(Header::Via), ["c"]);
    }

    #[test]
    fn iter_flattens_values() {
        let headers = [(Header::Via, "a"), (Header::CSeq, "3"), (Header::Via, "b")]
            .into_iter()
            .collect::<Headers>();
        let items = headers.iter().collect::<Vec<_>>();
        assert_eq!(
            items,
            vec![(Header::CSeq, "3"), (Header::Via, "a"), (Header::Via, "b")],
        );
    }

    #[test]
    fn split_list_respects_quotes() {
        assert_eq!(
            split_list("OPTIONS, PLAY ,SETUP").collect::<Vec<_>>(),
            vec!["OPTIONS", "PLAY", "SETUP"],
        );
        assert_eq!(
            split_list("a=\"x,y\", b").collect::<Vec<_>>(),
            vec!["a=\"x,y\"", "b"],
        );
        assert_eq!(split_list("").count(), 0);
    }
}
