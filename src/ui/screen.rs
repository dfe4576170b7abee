use crossterm::{
    cursor, execute,
    terminal::{self, ClearType},
};
use std::io::{self, Write};

/// Clear the terminal and move the cursor home before redrawing
pub fn clear_screen<W: Write>(out: &mut W) -> io::Result<()> {
    execute!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))
}
