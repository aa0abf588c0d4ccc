use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;

use memmap2::Mmap;

use crate::prelude::*;

/// Builds the status line, headers and body for one response, memory
/// mapping the body file read-only. The mapping lives until the next
/// `init` or an explicit `unmap_file`.
pub struct HttpResponse {
    code: Option<u16>,
    keep_alive: bool,
    path: String,
    src_dir: PathBuf,
    mm_file: Option<Mmap>,
}

impl HttpResponse {
    pub fn new() -> Self {
        HttpResponse {
            code: None,
            keep_alive: false,
            path: String::new(),
            src_dir: PathBuf::new(),
            mm_file: None,
        }
    }

    pub fn init(&mut self, src_dir: &Path, path: &str, keep_alive: bool, code: Option<u16>) {
        assert!(!src_dir.as_os_str().is_empty());
        self.unmap_file();
        self.code = code;
        self.keep_alive = keep_alive;
        self.path = path.to_string();
        self.src_dir = src_dir.to_path_buf();
    }

    pub fn make_response(&mut self, buf: &mut Buffer) {
        // A caller-supplied 400 stands; otherwise the file decides.
        if self.code != Some(400) {
            match fs::metadata(self.full_path()) {
                Err(_) => self.code = Some(404),
                Ok(meta) if meta.is_dir() => self.code = Some(404),
                // Permission follows the world-read bit only.
                Ok(meta) if meta.permissions().mode() & 0o004 == 0 => self.code = Some(403),
                Ok(_) => {
                    if self.code.is_none() {
                        self.code = Some(200);
                    }
                }
            }
        }
        self.error_html();
        self.add_state_line(buf);
        self.add_header(buf);
        self.add_content(buf);
    }

    pub fn code(&self) -> Option<u16> {
        self.code
    }

    /// The mapped body, when one exists.
    pub fn file(&self) -> Option<&[u8]> {
        self.mm_file.as_deref()
    }

    pub fn file_len(&self) -> usize {
        self.mm_file.as_ref().map_or(0, |mm| mm.len())
    }

    pub fn unmap_file(&mut self) {
        self.mm_file = None;
    }

    fn full_path(&self) -> PathBuf {
        self.src_dir.join(self.path.trim_start_matches('/'))
    }

    /// Error codes are answered with their static page.
    fn error_html(&mut self) {
        if let Some(page) = self.code.and_then(error_page) {
            self.path = page.to_string();
        }
    }

    fn add_state_line(&mut self, buf: &mut Buffer) {
        let code = match self.code {
            Some(c) if status_text(c).is_some() => c,
            _ => {
                self.code = Some(400);
                400
            }
        };
        let status = status_text(code).unwrap_or("Bad Request");
        buf.append(format!("HTTP/1.1 {} {}\r\n", code, status).as_bytes());
    }

    fn add_header(&mut self, buf: &mut Buffer) {
        buf.append(b"Connection: ");
        if self.keep_alive {
            buf.append(b"keep-alive\r\n");
            buf.append(b"keep-alive: max=6, timeout=120\r\n");
        } else {
            buf.append(b"close\r\n");
        }
        buf.append(format!("Content-type: {}\r\n", mime_type(&self.path)).as_bytes());
    }

    fn add_content(&mut self, buf: &mut Buffer) {
        let full = self.full_path();
        let file = match File::open(&full) {
            Ok(file) => file,
            Err(_) => {
                self.error_content(buf, "File NotFound!");
                return;
            }
        };
        let len = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        if len == 0 {
            // mmap rejects empty files; answer with an empty body.
            buf.append(b"Content-length: 0\r\n\r\n");
            return;
        }
        debug!("file path {}", full.display());
        match unsafe { Mmap::map(&file) } {
            Ok(mm) => {
                self.mm_file = Some(mm);
                buf.append(format!("Content-length: {}\r\n\r\n", len).as_bytes());
            }
            Err(_) => self.error_content(buf, "File NotFound!"),
        }
    }

    fn error_content(&mut self, buf: &mut Buffer, message: &str) {
        let code = self.code.unwrap_or(400);
        let status = status_text(code).unwrap_or("Bad Request");
        let mut body = String::new();
        body.push_str("<html><title>Error</title>");
        body.push_str("<body bgcolor=\"ffffff\">");
        body.push_str(&format!("{} : {}\n", code, status));
        body.push_str(&format!("<p>{}</p>", message));
        body.push_str("<hr><em>web_server</em></body></html>");
        buf.append(format!("Content-length: {}\r\n\r\n", body.len()).as_bytes());
        buf.append(body.as_bytes());
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        HttpResponse::new()
    }
}

fn status_text(code: u16) -> Option<&'static str> {
    match code {
        200 => Some("OK"),
        400 => Some("Bad Request"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        _ => None,
    }
}

fn error_page(code: u16) -> Option<&'static str> {
    match code {
        400 => Some("/400.html"),
        403 => Some("/403.html"),
        404 => Some("/404.html"),
        _ => None,
    }
}

/// Content type by lowercase extension; anything unknown is plain text.
pub fn mime_type(path: &str) -> &'static str {
    let ext = match path.rfind('.') {
        Some(i) => &path[i..],
        None => return "text/plain",
    };
    match ext.to_ascii_lowercase().as_str() {
        ".html" => "text/html",
        ".xml" => "text/xml",
        ".xhtml" => "application/xhtml+xml",
        ".txt" => "text/plain",
        ".rtf" => "application/rtf",
        ".pdf" => "application/pdf",
        ".word" => "application/nsword",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".au" => "audio/basic",
        ".mpeg" | ".mpg" => "video/mpeg",
        ".avi" => "video/x-msvideo",
        ".gz" => "application/x-gzip",
        ".tar" => "application/x-tar",
        ".css" => "text/css",
        ".js" => "text/javascript",
        _ => "text/plain",
    }
}
