pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Unknown profile: {name}")]
	UnknownProfile { name: String },
	#[error("Backend error: {message}")]
	Backend { message: String },
}
impl From<juris_providers::Error> for Error {
	fn from(err: juris_providers::Error) -> Self {
		Self::Backend { message: err.to_string() }
	}
}
