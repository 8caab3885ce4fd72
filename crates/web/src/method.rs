use std::fmt;

/// The verbs the router dispatches on.
///
/// Any other verb never reaches a router; the server answers it with 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const ALL: [Method; 5] = [Method::Get, Method::Post, Method::Put, Method::Patch, Method::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A verb outside of [`Method`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedMethod(pub http::Method);

impl TryFrom<&http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        match *method {
            http::Method::GET => Ok(Method::Get),
            http::Method::POST => Ok(Method::Post),
            http::Method::PUT => Ok(Method::Put),
            http::Method::PATCH => Ok(Method::Patch),
            http::Method::DELETE => Ok(Method::Delete),
            _ => Err(UnsupportedMethod(method.clone())),
        }
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_known_verbs() {
        for method in Method::ALL {
            let http_method = http::Method::from(method);
            assert_eq!(Method::try_from(&http_method), Ok(method));
            assert_eq!(http_method.as_str(), method.as_str());
        }
    }

    #[test]
    fn rejects_other_verbs() {
        assert_eq!(Method::try_from(&http::Method::HEAD), Err(UnsupportedMethod(http::Method::HEAD)));
        assert!(Method::try_from(&http::Method::OPTIONS).is_err());
    }
}
