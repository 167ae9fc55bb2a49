use std::io::Write;

use crossterm::{cursor, terminal, ExecutableCommand, Result};

use shared_resources::direction::Direction;

use crate::modules::lamps::LampBoard;

const HEADER_SIZE: u16 = 5;

fn lamp(lit: bool) -> &'static str {
    if lit {
        "ON"
    } else {
        "-"
    }
}

fn car_lamps(board: &LampBoard, floor: u8) -> String {
    (0..board.num_elevators())
        .map(|id| {
            if board.direction_lamp(floor, id, Direction::Up) {
                '^'
            } else if board.direction_lamp(floor, id, Direction::Down) {
                'v'
            } else {
                '.'
            }
        })
        .collect()
}

/// Draws the lamp table and moves the cursor back up so the next call
/// redraws it in place.
pub fn print_lamps(stdout: &mut impl Write, board: &LampBoard) -> Result<()> {
    stdout.execute(terminal::Clear(terminal::ClearType::FromCursorDown))?;

    writeln!(stdout, "+-----------------------------------------------------+")?;
    writeln!(stdout, "| FLOOR LAMPS                                         |")?;
    writeln!(stdout, "+------------+------------+------------+--------------+")?;
    writeln!(stdout, "| {0:<10} | {1:<10} | {2:<10} | {3:<12} |", "FLOOR", "HALL UP", "HALL DOWN", "CARS")?;
    writeln!(stdout, "+------------+------------+------------+--------------+")?;
    for floor in (1..=board.num_floors()).rev() {
        writeln!(
            stdout,
            "| {0:<10} | {1:<10} | {2:<10} | {3:<12} |",
            floor,
            lamp(board.floor_lamp(floor, Direction::Up)),
            lamp(board.floor_lamp(floor, Direction::Down)),
            car_lamps(board, floor)
        )?;
    }
    writeln!(stdout, "+------------+------------+------------+--------------+")?;

    stdout.execute(cursor::MoveUp(HEADER_SIZE + 1 + board.num_floors() as u16))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_every_floor_top_down() {
        let mut board = LampBoard::new(3, 2);
        board.set_floor_lamp(2, Direction::Up, true);
        board.set_direction_lamp(2, 1, Direction::Down, true);

        let mut out = Vec::new();
        print_lamps(&mut out, &board).unwrap();
        let text = String::from_utf8_lossy(&out);

        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("| ") && !l.contains("FLOOR")).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("| 3 "));
        assert!(rows[1].contains("ON"));
        assert!(rows[1].contains(".v"));
        assert!(rows[2].starts_with("| 1 "));
    }
}
