use http::Response;

/// A response before its body is attached.
pub type ResponseHead = Response<()>;
