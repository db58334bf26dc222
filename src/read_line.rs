use std::io::{self, BufRead, Write};

pub(crate) struct ReadLine {
    prompt: String,
    default: Option<String>,
    validate: Box<dyn Fn(&str) -> bool>,
}

impl ReadLine {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_owned(),
            default: None,
            validate: Box::new(default_validate),
        }
    }

    pub fn default(mut self, default: String) -> Self {
        self.default = Some(default);
        self
    }

    pub fn validate<V: Fn(&str) -> bool + 'static>(mut self, validate: V) -> Self {
        self.validate = Box::new(validate);
        self
    }

    pub fn get(self) -> io::Result<String> {
        let stdin = io::stdin();
        self.get_from(&mut stdin.lock(), &mut io::stdout())
    }

    /// Prompts until the answer passes validation.
    fn get_from<R: BufRead, W: Write>(self, input: &mut R, output: &mut W) -> io::Result<String> {
        loop {
            write!(
                output,
                "\n{prompt}{default}: ",
                prompt = self.prompt,
                default = self
                    .default
                    .as_ref()
                    .map(|d| format!(" [{d}]"))
                    .unwrap_or_default()
            )?;
            output.flush()?;

            let mut resp = String::new();
            if input.read_line(&mut resp)? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }

            resp = resp.trim().to_owned();

            if resp.is_empty() {
                if let Some(default) = self.default.as_ref() {
                    resp = default.to_owned();
                }
            }

            if self.validate.as_ref()(&resp) {
                return Ok(resp);
            }
        }
    }
}

/// Prints `names` as a numbered menu and returns the index picked.
pub(crate) fn choose(prompt: &str, names: &[&str]) -> io::Result<usize> {
    for (i, name) in names.iter().enumerate() {
        println!("{}) {name}", i + 1);
    }

    let count = names.len();
    let answer = ReadLine::new(&format!("{prompt} (input the number next to it)"))
        .validate(move |s| s.parse::<usize>().map_or(false, |n| (1..=count).contains(&n)))
        .get()?;

    answer
        .parse::<usize>()
        .map(|n| n - 1)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
}

fn default_validate(s: &str) -> bool {
    !s.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(line: ReadLine, input: &str) -> io::Result<String> {
        let mut output = Vec::new();
        line.get_from(&mut input.as_bytes(), &mut output)
    }

    #[test]
    fn trims_answer() {
        assert_eq!(answer(ReadLine::new("Email"), "  a@b.c \n").unwrap(), "a@b.c");
    }

    #[test]
    fn empty_uses_default() {
        let line = ReadLine::new("Host").default("imap.gmail.com".to_owned());
        assert_eq!(answer(line, "\n").unwrap(), "imap.gmail.com");
    }

    #[test]
    fn reprompts_until_valid() {
        let line = ReadLine::new("Pick").validate(|s| s == "2");
        assert_eq!(answer(line, "\nx\n2\n").unwrap(), "2");
    }

    #[test]
    fn eof_is_an_error() {
        let err = answer(ReadLine::new("Email"), "").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
