use passio_derive::passio_error;
use std::borrow::Cow;

#[passio_error]
pub enum OuterError {
    #[error("Rejected{}: {cause}", format_context(.context))]
    Rejected {
        #[source]
        cause: std::fmt::Error,
        context: Option<Cow<'static, str>>,
    },
}

impl From<std::fmt::Error> for OuterError {
    fn from(cause: std::fmt::Error) -> Self {
        Self::Rejected { cause, context: None }
    }
}

fn main() {
    let err: Result<(), OuterError> = Err(std::fmt::Error.into());
    let _ = err.context("formatting");
}
