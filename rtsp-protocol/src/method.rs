use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use super::Error;

/// RTSP request methods, plus the two HTTP methods used for tunneling.
///
/// The declaration order is significant: it determines both the bit
/// position of each method in a [`MethodSet`] and the order in which a set
/// is rendered.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Method {
    Describe,
    Announce,
    GetParameter,
    Options,
    Pause,
    Play,
    Record,
    Redirect,
    Setup,
    SetParameter,
    Teardown,
    Get,
    Post,
}

const METHODS: [(Method, &str); 13] = [
    (Method::Describe, "DESCRIBE"),
    (Method::Announce, "ANNOUNCE"),
    (Method::GetParameter, "GET_PARAMETER"),
    (Method::Options, "OPTIONS"),
    (Method::Pause, "PAUSE"),
    (Method::Play, "PLAY"),
    (Method::Record, "RECORD"),
    (Method::Redirect, "REDIRECT"),
    (Method::Setup, "SETUP"),
    (Method::SetParameter, "SET_PARAMETER"),
    (Method::Teardown, "TEARDOWN"),
    (Method::Get, "GET"),
    (Method::Post, "POST"),
];

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        METHODS[self as usize].1
    }

    #[must_use]
    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Case-insensitive lookup. Returns `None` for anything that is not a
    /// known method name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        METHODS
            .iter()
            .find(|(_, text)| text.eq_ignore_ascii_case(name))
            .map(|(method, _)| *method)
    }

    #[must_use]
    pub const fn is_http(self) -> bool {
        matches!(self, Self::Get | Self::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::MethodUnknown {
            method: s.to_string(),
            cseq: None,
        })
    }
}

/// A set of methods, stored as a bitmask. Used to announce the supported
/// methods in the `Public` header of an OPTIONS response.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct MethodSet(u16);

impl MethodSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn with(self, method: Method) -> Self {
        Self(self.0 | method.bit())
    }

    #[must_use]
    pub const fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Iterate over the methods in the set in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Method> {
        METHODS
            .iter()
            .map(|(method, _)| *method)
            .filter(move |method| self.contains(*method))
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::empty().with(method)
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl BitOr for Method {
    type Output = MethodSet;

    fn bitor(self, rhs: Method) -> MethodSet {
        MethodSet::from(self).with(rhs)
    }
}

impl BitOr<Method> for MethodSet {
    type Output = MethodSet;

    fn bitor(self, rhs: Method) -> MethodSet {
        self.with(rhs)
    }
}

impl BitOr for MethodSet {
    type Output = MethodSet;

    fn bitor(self, rhs: MethodSet) -> MethodSet {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign<Method> for MethodSet {
    fn bitor_assign(&mut self, rhs: Method) {
        *self = self.with(rhs);
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, method) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{method}")?;
        }
        Ok(())
    }
}
