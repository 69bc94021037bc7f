use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use md5::Md5;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Base64Encode,
    Base64Decode,
    Md5,
    Sha256,
    Url,
    Json,
    WebSearch,
    Shell,
}

impl Tool {
    pub fn label(self) -> &'static str {
        match self {
            Self::Base64Encode => "Base64 encode",
            Self::Base64Decode => "Base64 decode",
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
            Self::Url => "URL encode/decode",
            Self::Json => "JSON pretty-print",
            Self::WebSearch => "Web search",
            Self::Shell => "Shell command",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "base64" => Some(Self::Base64Encode),
            "base64d" => Some(Self::Base64Decode),
            "md5" => Some(Self::Md5),
            "sha256" => Some(Self::Sha256),
            "url" => Some(Self::Url),
            "json" => Some(Self::Json),
            "g" => Some(Self::WebSearch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid base64 input: {0}")]
    InvalidBase64(String),
    #[error("decoded bytes are not UTF-8")]
    NotUtf8,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("{0:?} is resolved by the action registry, not evaluated as text")]
    NotATextTool(Tool),
}

/// Recognizes `<prefix> <argument>` for the fixed tool prefixes and `>` for
/// shell commands. A bare prefix without an argument is not claimed.
pub fn parse_tool(raw: &str) -> Option<ToolInvocation> {
    let trimmed = raw.trim_start();
    if let Some(rest) = trimmed.strip_prefix('>') {
        let command = rest.trim();
        if command.is_empty() {
            return None;
        }
        return Some(ToolInvocation {
            tool: Tool::Shell,
            argument: command.to_string(),
        });
    }

    let (prefix, rest) = trimmed.split_once(char::is_whitespace)?;
    let tool = Tool::from_prefix(prefix)?;
    let argument = rest.trim();
    if argument.is_empty() {
        return None;
    }
    Some(ToolInvocation {
        tool,
        argument: argument.to_string(),
    })
}

pub fn run_tool(invocation: &ToolInvocation) -> Result<String, ToolError> {
    let input = invocation.argument.as_str();
    match invocation.tool {
        Tool::Base64Encode => Ok(BASE64_STANDARD.encode(input.as_bytes())),
        Tool::Base64Decode => {
            let bytes = BASE64_STANDARD
                .decode(input.trim())
                .map_err(|error| ToolError::InvalidBase64(error.to_string()))?;
            String::from_utf8(bytes).map_err(|_| ToolError::NotUtf8)
        }
        Tool::Md5 => Ok(hex_digest(Md5::digest(input.as_bytes()).as_slice())),
        Tool::Sha256 => Ok(hex_digest(Sha256::digest(input.as_bytes()).as_slice())),
        Tool::Url => {
            if is_percent_encoded(input) {
                Ok(percent_decode(input))
            } else {
                Ok(percent_encode(input, false))
            }
        }
        Tool::Json => {
            let value: serde_json::Value = serde_json::from_str(input)
                .map_err(|error| ToolError::InvalidJson(error.to_string()))?;
            serde_json::to_string_pretty(&value)
                .map_err(|error| ToolError::InvalidJson(error.to_string()))
        }
        Tool::WebSearch | Tool::Shell => Err(ToolError::NotATextTool(invocation.tool)),
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn percent_encode(input: &str, space_as_plus: bool) -> String {
    let mut out = String::new();
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(byte as char);
        } else if byte == b' ' && space_as_plus {
            out.push('+');
        } else {
            out.push('%');
            out.push_str(&format!("{byte:02X}"));
        }
    }
    out
}

fn is_percent_encoded(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.windows(3).any(|window| {
        window[0] == b'%' && window[1].is_ascii_hexdigit() && window[2].is_ascii_hexdigit()
    })
}

pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[index + 1]), hex_value(bytes[index + 2])) {
                out.push(high << 4 | low);
                index += 3;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|digit| digit as u8)
}
