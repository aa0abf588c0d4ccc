use core::fmt;

use crate::prelude::*;

/// Bare paths that resolve to their `.html` page.
const DEFAULT_HTML: [&str; 6] = [
    "/index",
    "/register",
    "/login",
    "/welcome",
    "/video",
    "/picture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePhase {
    RequestLine,
    Headers,
    Body,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer ends mid-request; parsing resumes on the next read.
    Incomplete,
    MalformedRequestLine,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Incomplete => write!(f, "incomplete request"),
            ParseError::MalformedRequestLine => write!(f, "malformed request line"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Incremental HTTP/1.1 request parser. Whole CRLF-terminated lines are
/// consumed from the buffer as they parse; a partial line stays put until
/// more bytes arrive.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub form: HashMap<String, String>,
    phase: ParsePhase,
}

impl HttpRequest {
    pub fn new() -> Self {
        HttpRequest {
            method: String::new(),
            path: String::new(),
            version: String::new(),
            headers: HashMap::new(),
            body: String::new(),
            form: HashMap::new(),
            phase: ParsePhase::RequestLine,
        }
    }

    pub fn init(&mut self) {
        self.method.clear();
        self.path.clear();
        self.version.clear();
        self.headers.clear();
        self.body.clear();
        self.form.clear();
        self.phase = ParsePhase::RequestLine;
    }

    pub fn phase(&self) -> ParsePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ParsePhase::Finish
    }

    /// Advances the parser as far as the buffered bytes allow. `Ok` means
    /// a full request was parsed; `Incomplete` asks the caller for more
    /// data; anything else is a 400.
    pub fn parse(&mut self, buf: &mut Buffer) -> std::result::Result<(), ParseError> {
        if buf.readable_bytes() == 0 && self.phase != ParsePhase::Finish {
            return Err(ParseError::Incomplete);
        }
        while self.phase != ParsePhase::Finish {
            match self.phase {
                ParsePhase::RequestLine => {
                    let line = take_line(buf).ok_or(ParseError::Incomplete)?;
                    self.parse_request_line(&line)?;
                    self.parse_path();
                }
                ParsePhase::Headers => {
                    let line = take_line(buf).ok_or(ParseError::Incomplete)?;
                    if !self.parse_header(&line) {
                        // Header block over: straight to Finish when only
                        // the blank separator ended the request.
                        self.phase = if buf.readable_bytes() == 0 {
                            ParsePhase::Finish
                        } else {
                            ParsePhase::Body
                        };
                    }
                }
                ParsePhase::Body => {
                    if buf.readable_bytes() == 0 {
                        return Err(ParseError::Incomplete);
                    }
                    self.parse_body(buf);
                }
                ParsePhase::Finish => {}
            }
        }
        debug!("[{}], [{}], [{}]", self.method, self.path, self.version);
        Ok(())
    }

    pub fn is_keep_alive(&self) -> bool {
        self.headers.get("Connection").map(String::as_str) == Some("keep-alive")
            && self.version == "1.1"
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    /// `method SP path SP "HTTP/" version`
    fn parse_request_line(&mut self, line: &str) -> std::result::Result<(), ParseError> {
        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.len() != 3 || !tokens[2].starts_with("HTTP/") {
            error!("request line error: [{line}]");
            return Err(ParseError::MalformedRequestLine);
        }
        self.method = tokens[0].to_string();
        self.path = tokens[1].to_string();
        self.version = tokens[2]["HTTP/".len()..].to_string();
        self.phase = ParsePhase::Headers;
        Ok(())
    }

    /// `name ":" OWS value`. A line that does not match ends the headers.
    fn parse_header(&mut self, line: &str) -> bool {
        match line.split_once(':') {
            Some((name, value)) => {
                let value = value.strip_prefix(' ').unwrap_or(value);
                self.headers.insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    /// The body is the current line; one without a trailing CRLF is taken
    /// whole.
    fn parse_body(&mut self, buf: &mut Buffer) {
        let (body, advance) = {
            let data = buf.peek();
            match find_crlf(data) {
                Some(pos) => (String::from_utf8_lossy(&data[..pos]).into_owned(), pos + 2),
                None => (String::from_utf8_lossy(data).into_owned(), data.len()),
            }
        };
        buf.has_read(advance);
        self.body = body;
        self.parse_post();
        self.phase = ParsePhase::Finish;
        debug!("body: [{}], len: {}", self.body, self.body.len());
    }

    fn parse_path(&mut self) {
        if self.path == "/" {
            self.path = "/index.html".to_string();
        } else if DEFAULT_HTML.contains(&self.path.as_str()) {
            self.path.push_str(".html");
        }
    }

    fn parse_post(&mut self) {
        if self.method != "POST"
            || self.headers.get("Content-Type").map(String::as_str)
                != Some("application/x-www-form-urlencoded")
        {
            return;
        }
        self.parse_from_urlencoded();
        let is_login = match self.path.as_str() {
            "/register.html" => false,
            "/login.html" => true,
            _ => return,
        };
        let name = self.form_value("username").unwrap_or_default();
        let password = self.form_value("password").unwrap_or_default();
        if user_verify(name, password, is_login) {
            self.path = "/welcome.html".to_string();
        } else {
            self.path = "/error.html".to_string();
        }
    }

    fn parse_from_urlencoded(&mut self) {
        if self.body.is_empty() {
            return;
        }
        for pair in self.body.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                continue;
            }
            self.form
                .insert(decode_component(key), decode_component(value));
        }
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        HttpRequest::new()
    }
}

/// Credential check hook. The serving core ships without the remote
/// user store and accepts everyone.
pub fn user_verify(_name: &str, _password: &str, _is_login: bool) -> bool {
    true
}

/// Percent- and plus-decodes one urlencoded component.
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
            {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

/// Consumes one CRLF-terminated line, or nothing when none is complete.
fn take_line(buf: &mut Buffer) -> Option<String> {
    let (line, advance) = {
        let data = buf.peek();
        let pos = find_crlf(data)?;
        (String::from_utf8_lossy(&data[..pos]).into_owned(), pos + 2)
    };
    buf.has_read(advance);
    Some(line)
}
