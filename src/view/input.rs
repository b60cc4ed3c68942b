//! Message input: multi-line text with a cursor and auto-sized height.

/// Tallest the input grows before it starts scrolling.
pub const MAX_INPUT_ROWS: u16 = 5;

/// Text input state.
#[derive(Debug)]
pub struct Composer {
    /// Current input text.
    input: String,
    /// Cursor position (character offset into `input`).
    cursor_pos: usize,
    /// Rows the input box occupies, recomputed after every edit.
    height: u16,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            input: String::new(),
            cursor_pos: 0,
            height: 1,
        }
    }
}

impl Composer {
    pub fn text(&self) -> &str {
        &self.input
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor_pos);
        self.input.insert(byte_pos, c);
        self.cursor_pos += 1;
        self.adjust_height();
    }

    /// Insert a string at the cursor (bracketed paste).
    pub fn insert_str(&mut self, s: &str) {
        let byte_pos = self.char_to_byte(self.cursor_pos);
        self.input.insert_str(byte_pos, s);
        self.cursor_pos += s.chars().count();
        self.adjust_height();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            let byte_pos = self.char_to_byte(self.cursor_pos);
            let prev_byte_pos = self.char_to_byte(self.cursor_pos - 1);
            self.input.drain(prev_byte_pos..byte_pos);
            self.cursor_pos -= 1;
            self.adjust_height();
        }
    }

    /// Delete the character at the cursor.
    pub fn delete(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            let byte_pos = self.char_to_byte(self.cursor_pos);
            let next_byte_pos = self.char_to_byte(self.cursor_pos + 1);
            self.input.drain(byte_pos..next_byte_pos);
            self.adjust_height();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            self.cursor_pos += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_pos = self.input.chars().count();
    }

    /// Clear the text and shrink back to one row.
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
        self.adjust_height();
    }

    /// Cursor position as (line, column), both in characters.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.input.chars().take(self.cursor_pos).collect();
        let line = before.matches('\n').count();
        let col = before
            .rsplit('\n')
            .next()
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line, col)
    }

    /// Grow with the number of lines, up to `MAX_INPUT_ROWS`.
    fn adjust_height(&mut self) {
        let lines = self.input.split('\n').count().max(1);
        self.height = (lines as u16).min(MAX_INPUT_ROWS);
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
