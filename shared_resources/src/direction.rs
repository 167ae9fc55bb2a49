use std::fmt;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Stop,
    Up,
}

impl Direction {
    /// Parses a hall button label ("up" / "down", any case).
    pub fn from_button(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }

    /// Direction of travel from `from` to `to`; `Stop` when they are equal.
    pub fn towards(from: u8, to: u8) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Stop,
        }
    }

    /// The floor one step away in this direction. `Stop` is treated as `Down`.
    pub fn next_floor(self, floor: u8) -> u8 {
        match self {
            Direction::Up => floor.saturating_add(1),
            Direction::Down | Direction::Stop => floor.saturating_sub(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Stop => "stop",
            Direction::Up => "up",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
