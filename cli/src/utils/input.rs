use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parses a JSON argument given inline or as `@path/to/file.json`
pub fn read_json_arg<T: DeserializeOwned>(arg: &str) -> Result<T> {
    match arg.strip_prefix('@') {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read JSON file: {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON file: {}", path))
        }
        None => serde_json::from_str(arg).context("Failed to parse inline JSON argument"),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Uses the given password, or asks for one on the terminal
pub fn prompt_password(cli_arg_value: Option<String>, username: &str) -> Result<String> {
    match cli_arg_value {
        Some(password) => Ok(password),
        None => dialoguer::Password::new()
            .with_prompt(format!("Password for {}", username))
            .interact()
            .context("Failed to read password"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_inline_json() {
        let values: Vec<u32> = read_json_arg("[1, 2, 3]").unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_read_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("values.json");
        fs::write(&path, "[4, 5]").unwrap();

        let values: Vec<u32> = read_json_arg(&format!("@{}", path.display())).unwrap();
        assert_eq!(values, vec![4, 5]);
    }

    #[test]
    fn test_read_json_errors_name_the_source() {
        let err = read_json_arg::<Vec<u32>>("@/nonexistent/values.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/values.json"));

        let err = read_json_arg::<Vec<u32>>("not json").unwrap_err();
        assert!(err.to_string().contains("inline JSON"));
    }

    #[test]
    fn test_explicit_password_skips_prompt() {
        assert_eq!(
            prompt_password(Some("hunter2".to_string()), "alice").unwrap(),
            "hunter2"
        );
    }
}
