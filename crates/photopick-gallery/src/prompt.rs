//! Interactive numbered-menu selection.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("input closed before a choice was made")]
    Closed,
    #[error("nothing to choose from")]
    NoOptions,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a typed answer was not accepted.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChoiceError {
    #[error("not a number; please enter a number")]
    NotANumber,
    #[error("no such option; enter a number from 1 to {0}")]
    OutOfRange(usize),
}

/// Lets the user pick one of several options.
#[async_trait]
pub trait Chooser: Send {
    /// Returns the zero-based index of the chosen option.
    async fn choose(&mut self, heading: &str, options: &[String]) -> Result<usize, PromptError>;
}

/// Parse a 1-based menu answer into a zero-based index.
pub fn parse_choice(input: &str, count: usize) -> Result<usize, ChoiceError> {
    let n: usize = input.trim().parse().map_err(|_| ChoiceError::NotANumber)?;
    if (1..=count).contains(&n) {
        Ok(n - 1)
    } else {
        Err(ChoiceError::OutOfRange(count))
    }
}

/// Menu on a writer, answers from a line reader; re-asks until valid.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[async_trait]
impl<R, W> Chooser for ConsolePrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn choose(&mut self, heading: &str, options: &[String]) -> Result<usize, PromptError> {
        if options.is_empty() {
            return Err(PromptError::NoOptions);
        }

        let mut menu = format!("\n{heading}:\n");
        for (i, option) in options.iter().enumerate() {
            menu.push_str(&format!("{}. {option}\n", i + 1));
        }
        self.output.write_all(menu.as_bytes()).await?;

        let mut line = String::new();
        loop {
            self.output.write_all(b"Enter a number: ").await?;
            self.output.flush().await?;

            line.clear();
            if self.input.read_line(&mut line).await? == 0 {
                return Err(PromptError::Closed);
            }
            match parse_choice(&line, options.len()) {
                Ok(index) => {
                    self.output
                        .write_all(format!("Selected '{}'.\n", options[index]).as_bytes())
                        .await?;
                    return Ok(index);
                }
                Err(e) => {
                    self.output.write_all(format!("{e}\n").as_bytes()).await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Spring trip".into(), "Sports day".into(), "Graduation".into()]
    }

    #[test]
    fn test_parse_choice_valid() {
        assert_eq!(parse_choice("1", 3), Ok(0));
        assert_eq!(parse_choice(" 3\n", 3), Ok(2));
    }

    #[test]
    fn test_parse_choice_invalid() {
        assert_eq!(parse_choice("abc", 3), Err(ChoiceError::NotANumber));
        assert_eq!(parse_choice("", 3), Err(ChoiceError::NotANumber));
        assert_eq!(parse_choice("-1", 3), Err(ChoiceError::NotANumber));
        assert_eq!(parse_choice("0", 3), Err(ChoiceError::OutOfRange(3)));
        assert_eq!(parse_choice("4", 3), Err(ChoiceError::OutOfRange(3)));
    }

    #[tokio::test]
    async fn test_reprompts_until_valid() {
        let input: &[u8] = b"x\n9\n0\n2\n";
        let mut prompt = ConsolePrompt::new(input, Vec::new());
        let idx = prompt.choose("Pick a room", &options()).await.unwrap();
        assert_eq!(idx, 1);

        let out = String::from_utf8(prompt.into_output()).unwrap();
        assert!(out.contains("1. Spring trip"));
        assert!(out.contains("3. Graduation"));
        assert_eq!(out.matches("Enter a number: ").count(), 4);
        assert!(out.contains("not a number"));
        assert!(out.contains("Selected 'Sports day'."));
    }

    #[tokio::test]
    async fn test_eof_is_error() {
        let input: &[u8] = b"nope\n";
        let mut prompt = ConsolePrompt::new(input, Vec::new());
        let err = prompt.choose("Pick", &options()).await.unwrap_err();
        assert!(matches!(err, PromptError::Closed));
    }

    #[tokio::test]
    async fn test_no_options() {
        let input: &[u8] = b"1\n";
        let mut prompt = ConsolePrompt::new(input, Vec::new());
        assert!(matches!(prompt.choose("Pick", &[]).await, Err(PromptError::NoOptions)));
    }
}
