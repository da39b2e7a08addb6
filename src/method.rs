//! HTTP method as a typed enum, plus a compact set of methods.
//!
//! Only the methods a route table keeps buckets for are representable:
//! `OPTIONS`, `HEAD`, `GET`, `POST`, `PUT` and `DELETE`. Anything else is
//! rejected at the server level with `405 Method Not Allowed` before it
//! ever reaches dispatch.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A supported HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Options,
    Head,
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Number of supported methods.
    pub const COUNT: usize = 6;

    /// Every supported method, in bucket order.
    pub const ALL: [Method; Self::COUNT] = [
        Self::Options,
        Self::Head,
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Head    => "HEAD",
            Self::Get     => "GET",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Delete  => "DELETE",
        }
    }

    /// Position of this method's bucket in a route table.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Options => 0,
            Self::Head    => 1,
            Self::Get     => 2,
            Self::Post    => 3,
            Self::Put     => 4,
            Self::Delete  => 5,
        }
    }

    fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Parses a method name. Case-insensitive: route tables are keyed by the
/// lowercase name on registration and by the wire name on dispatch.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownMethod(s.to_owned()))
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = Error;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`Method`]s a route or middleware binding applies to.
///
/// ```rust
/// use tsuji::{Method, MethodSet};
///
/// let set = MethodSet::from([Method::Get, Method::Head]);
/// assert!(set.contains(Method::Head));
/// assert!(!set.contains(Method::Post));
/// assert!(MethodSet::ALL.contains(Method::Delete));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MethodSet(u8);

impl MethodSet {
    /// Every supported method; what `*` (or an omitted method) means.
    pub const ALL: MethodSet = MethodSet(0b11_1111);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn insert(&mut self, method: Method) {
        self.0 |= method.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the members in bucket order.
    pub fn iter(self) -> impl Iterator<Item = Method> {
        Method::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self(method.bit())
    }
}

impl<const N: usize> From<[Method; N]> for MethodSet {
    fn from(methods: [Method; N]) -> Self {
        methods.into_iter().collect()
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut set = Self::empty();
        for method in iter {
            set.insert(method);
        }
        set
    }
}

/// Parses `*` (or the empty string) as every method, otherwise a
/// comma-separated list such as `"get,post"`.
impl FromStr for MethodSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::ALL);
        }
        s.split(',').map(|part| part.trim().parse::<Method>()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DeLeTe".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!("PATCH".parse::<Method>(), Err(Error::UnknownMethod(m)) if m == "PATCH"));
    }

    #[test]
    fn star_means_every_method() {
        let set: MethodSet = "*".parse().unwrap();
        assert_eq!(set, MethodSet::ALL);
        assert_eq!(set.iter().count(), Method::ALL.len());
    }

    #[test]
    fn comma_list() {
        let set: MethodSet = "get, post".parse().unwrap();
        assert!(set.contains(Method::Get));
        assert!(set.contains(Method::Post));
        assert!(!set.contains(Method::Put));
        assert!("get,brew".parse::<MethodSet>().is_err());
    }

    #[test]
    fn from_http_method() {
        assert_eq!(Method::try_from(&http::Method::OPTIONS).unwrap(), Method::Options);
        assert!(Method::try_from(&http::Method::PATCH).is_err());
    }
}
