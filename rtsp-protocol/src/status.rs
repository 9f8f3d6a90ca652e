use std::fmt;

pub type StatusCode = u16;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u16)]
pub enum Status {
    Continue = 100,
    Ok = 200,
    Created = 201,
    LowOnStorage = 250,
    MultipleChoices = 300,
    MovedPermanently = 301,
    MoveTemporarily = 302,
    SeeOther = 303,
    NotModified = 304,
    UseProxy = 305,
    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthRequired = 407,
    RequestTimeout = 408,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFailed = 412,
    RequestEntityTooLarge = 413,
    RequestUriTooLarge = 414,
    UnsupportedMediaType = 415,
    ParameterNotUnderstood = 451,
    ConferenceNotFound = 452,
    NotEnoughBandwidth = 453,
    SessionNotFound = 454,
    MethodNotValidInThisState = 455,
    HeaderFieldNotValidForResource = 456,
    InvalidRange = 457,
    ParameterIsReadOnly = 458,
    AggregateOperationNotAllowed = 459,
    OnlyAggregateOperationAllowed = 460,
    UnsupportedTransport = 461,
    DestinationUnreachable = 462,
    KeyManagementFailure = 463,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    RtspVersionNotSupported = 505,
    OptionNotSupported = 551,
}

const STATUSES: [(Status, &str); 45] = [
    (Status::Continue, "Continue"),
    (Status::Ok, "OK"),
    (Status::Created, "Created"),
    (Status::LowOnStorage, "Low on Storage Space"),
    (Status::MultipleChoices, "Multiple Choices"),
    (Status::MovedPermanently, "Moved Permanently"),
    (Status::MoveTemporarily, "Move Temporarily"),
    (Status::SeeOther, "See Other"),
    (Status::NotModified, "Not Modified"),
    (Status::UseProxy, "Use Proxy"),
    (Status::BadRequest, "Bad Request"),
    (Status::Unauthorized, "Unauthorized"),
    (Status::PaymentRequired, "Payment Required"),
    (Status::Forbidden, "Forbidden"),
    (Status::NotFound, "Not Found"),
    (Status::MethodNotAllowed, "Method Not Allowed"),
    (Status::NotAcceptable, "Not Acceptable"),
    (Status::ProxyAuthRequired, "Proxy Authentication Required"),
    (Status::RequestTimeout, "Request Timeout"),
    (Status::Gone, "Gone"),
    (Status::LengthRequired, "Length Required"),
    (Status::PreconditionFailed, "Precondition Failed"),
    (Status::RequestEntityTooLarge, "Request Entity Too Large"),
    (Status::RequestUriTooLarge, "Request-URI Too Large"),
    (Status::UnsupportedMediaType, "Unsupported Media Type"),
    (Status::ParameterNotUnderstood, "Parameter Not Understood"),
    (Status::ConferenceNotFound, "Conference Not Found"),
    (Status::NotEnoughBandwidth, "Not Enough Bandwidth"),
    (Status::SessionNotFound, "Session Not Found"),
    (Status::MethodNotValidInThisState, "Method Not Valid in This State"),
    (Status::HeaderFieldNotValidForResource, "Header Field Not Valid for Resource"),
    (Status::InvalidRange, "Invalid Range"),
    (Status::ParameterIsReadOnly, "Parameter Is Read-Only"),
    (Status::AggregateOperationNotAllowed, "Aggregate Operation Not Allowed"),
    (Status::OnlyAggregateOperationAllowed, "Only Aggregate Operation Allowed"),
    (Status::UnsupportedTransport, "Unsupported Transport"),
    (Status::DestinationUnreachable, "Destination Unreachable"),
    (Status::KeyManagementFailure, "Key Management Failure"),
    (Status::InternalServerError, "Internal Server Error"),
    (Status::NotImplemented, "Not Implemented"),
    (Status::BadGateway, "Bad Gateway"),
    (Status::ServiceUnavailable, "Service Unavailable"),
    (Status::GatewayTimeout, "Gateway Time-out"),
    (Status::RtspVersionNotSupported, "RTSP Version Not Supported"),
    (Status::OptionNotSupported, "Option Not Supported"),
];

impl Status {
    #[must_use]
    pub const fn code(self) -> StatusCode {
        self as StatusCode
    }

    #[must_use]
    pub fn reason(self) -> &'static str {
        STATUSES
            .iter()
            .find(|(status, _)| *status == self)
            .map_or("", |(_, reason)| reason)
    }

    #[must_use]
    pub fn from_code(code: StatusCode) -> Option<Self> {
        STATUSES
            .iter()
            .find(|(status, _)| status.code() == code)
            .map(|(status, _)| *status)
    }

    #[must_use]
    pub fn category(self) -> StatusCategory {
        StatusCategory::of(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// Default reason phrase for a status code, if the code is known.
#[must_use]
pub fn status_text(code: StatusCode) -> Option<&'static str> {
    Status::from_code(code).map(Status::reason)
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StatusCategory {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    Unknown,
}

impl StatusCategory {
    #[must_use]
    pub const fn of(code: StatusCode) -> Self {
        match code {
            100..=199 => Self::Informational,
            200..=299 => Self::Success,
            300..=399 => Self::Redirection,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}
