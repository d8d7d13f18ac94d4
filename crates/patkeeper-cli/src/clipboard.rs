//! Clipboard access through the OSC 52 terminal escape, which works over
//! SSH and needs no platform clipboard library.

use std::io::{self, IsTerminal, Write};

use base64::{engine::general_purpose::STANDARD, Engine};

use patkeeper_core::{Clipboard, ClipboardError};

pub struct Osc52Clipboard<W: Write> {
    out: W,
    is_terminal: bool,
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let is_terminal = out.is_terminal();
        Self { out, is_terminal }
    }
}

impl<W: Write> Osc52Clipboard<W> {
    #[cfg(test)]
    fn new(out: W, is_terminal: bool) -> Self {
        Self { out, is_terminal }
    }
}

/// `ESC ] 52 ; c ; <base64> BEL`
fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if !self.is_terminal {
            return Err(ClipboardError("output is not a terminal".to_string()));
        }
        self.out
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| ClipboardError(e.to_string()))
    }
}
