use anyhow::Result;
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use connect4_solver::{
    bitboard::{BitBoard, Player},
    HEIGHT, WIDTH,
};

/// Draws the board with coloured tiles, first player red and second player yellow
pub fn draw_board(board: &BitBoard) -> Result<()> {
    let mut stdout = stdout();

    let cols: String = (1..=WIDTH).map(|x| x.to_string()).collect();
    stdout.queue(PrintStyledContent(style(format!("\n{}\n", cols))))?;

    for row in (0..HEIGHT).rev() {
        for column in 0..WIDTH {
            stdout.queue(PrintStyledContent(
                style("O")
                    .attribute(Attribute::Bold)
                    .on(Color::DarkBlue)
                    .with(match board.owner(column, row) {
                        Some(Player::First) => Color::Red,
                        Some(Player::Second) => Color::Yellow,
                        None => Color::DarkBlue,
                    }),
            ))?;
        }
        stdout.queue(PrintStyledContent(style("\n".to_string())))?;
    }
    stdout.flush()?;
    Ok(())
}
