use passio_derive::passio_error;
use std::borrow::Cow;
use std::error::Error as _;

#[passio_error]
pub enum SampleError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Parse error{}: {cause}", format_context(.context))]
    Parse {
        #[source]
        cause: std::num::ParseIntError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Missing entry {id}")]
    Missing { id: u64 },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(input: &str) -> Result<u64, SampleError> {
    input.parse::<u64>().map_err(|cause| SampleError::Parse { cause, context: None })
}

#[test]
fn source_field_converts_with_question_mark() {
    fn open() -> Result<(), SampleError> {
        Err(std::io::Error::other("disk gone"))?;
        Ok(())
    }

    let err = open().unwrap_err();
    assert_eq!(err.kind(), "Io");
    assert_eq!(err.to_string(), "IO error: disk gone");
    assert!(err.source().is_some());
}

#[test]
fn context_on_foreign_result_annotates_message() {
    let result: Result<(), std::io::Error> = Err(std::io::Error::other("denied"));
    let err = result.context("opening vault").unwrap_err();

    assert_eq!(err.to_string(), "IO error (opening vault): denied");
}

#[test]
fn context_on_own_result_fills_slot() {
    let err = parse("abc").context("reading id").unwrap_err();

    assert_eq!(err.kind(), "Parse");
    assert!(err.to_string().starts_with("Parse error (reading id): "));
    assert!(err.source().is_some());
}

#[test]
fn context_skips_variants_without_slot() {
    let result: Result<(), SampleError> = Err(SampleError::Missing { id: 7 });
    let err = result.context("ignored").unwrap_err();

    assert_eq!(err.to_string(), "Missing entry 7");
    assert_eq!(err.kind(), "Missing");
}

#[test]
fn strings_convert_into_internal() {
    let borrowed = SampleError::from("invariant broken");
    let owned = SampleError::from(format!("counter {}", 3));

    assert_eq!(borrowed.kind(), "Internal");
    assert_eq!(borrowed.to_string(), "Internal error: invariant broken");
    assert_eq!(owned.to_string(), "Internal error: counter 3");
}

#[test]
fn parse_succeeds_without_error() {
    assert_eq!(parse("42").unwrap(), 42);
}
