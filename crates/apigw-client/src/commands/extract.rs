//! `apigw extract`: print the signed part of a saved reply.

use std::io::Read;
use std::path::Path;

use apigw_core::extract_response_to_sign;

use crate::error::{CliError, CliResult};

/// Reads a reply body from `path`, or stdin when `path` is `-`.
pub fn read_body(path: &Path) -> CliResult<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        Ok(body)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Runs `apigw extract`.
pub fn run(path: &Path) -> CliResult<()> {
    let body = read_body(path)?;
    let signed = extract_response_to_sign(&body).ok_or_else(|| {
        CliError::Input(format!(
            "{} is not a signed gateway reply",
            path.display()
        ))
    })?;
    println!("{}", signed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_reply_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.json");
        std::fs::write(&path, "{\"sign\":\"x\", \"response\":{\"a\":  1}}").unwrap();

        assert_eq!(read_body(&path).unwrap(), "{\"sign\":\"x\", \"response\":{\"a\":  1}}");
        assert!(run(&path).is_ok());
    }

    #[test]
    fn rejects_unsigned_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.json");
        std::fs::write(&path, "{\"result\": {\"a\":  1}}").unwrap();
        assert!(matches!(run(&path), Err(CliError::Input(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run(&dir.path().join("absent.json")),
            Err(CliError::Io(_))
        ));
    }
}
