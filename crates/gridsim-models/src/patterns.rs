//! Named Game of Life structures.

/// A fixed pattern drawn with `O` for live cells and `.` for dead ones
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    pub name: &'static str,
    rows: &'static [&'static str],
}

impl Pattern {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Offsets (row, col) of the live cells relative to the top-left corner
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, line)| {
            line.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'O')
                .map(move |(c, _)| (r, c))
        })
    }
}

const PATTERNS: &[Pattern] = &[
    Pattern {
        name: "block",
        rows: &["OO", "OO"],
    },
    Pattern {
        name: "beehive",
        rows: &[".O.", "O.O", "O.O", ".O."],
    },
    Pattern {
        name: "blinker",
        rows: &[".O.", ".O.", ".O."],
    },
    Pattern {
        name: "toad",
        rows: &["OOO.", ".OOO"],
    },
    Pattern {
        name: "beacon",
        rows: &["OO..", "OO..", "..OO", "..OO"],
    },
    Pattern {
        name: "glider",
        rows: &[".O.", "..O", "OOO"],
    },
    Pattern {
        name: "pulsar",
        rows: &[
            "..OOO...OOO..",
            ".............",
            "O....O.O....O",
            "O....O.O....O",
            "O....O.O....O",
            "..OOO...OOO..",
            ".............",
            "..OOO...OOO..",
            "O....O.O....O",
            "O....O.O....O",
            "O....O.O....O",
            ".............",
            "..OOO...OOO..",
        ],
    },
    Pattern {
        name: "gun",
        rows: &[
            "........................O...........",
            "......................O.O...........",
            "............OO......OO............OO",
            "...........O...O....OO............OO",
            "OO........O.....O...OO..............",
            "OO........O...O.OO....O.O...........",
            "..........O.....O.......O...........",
            "...........O...O....................",
            "............OO......................",
        ],
    },
    Pattern {
        name: "pentadecathlon",
        rows: &["..O....O..", "OO.OOOO.OO", "..O....O.."],
    },
    Pattern {
        name: "heavyglider",
        rows: &["...OO..", ".O....O", "O......", "O.....O", "OOOOOO."],
    },
];

/// Older names that resolve to the same structures
const ALIASES: &[(&str, &str)] = &[
    ("static", "beehive"),
    ("pentadecon", "pentadecathlon"),
    ("glidergun", "gun"),
];

/// Look up a pattern by (case-insensitive) name
pub fn find(name: &str) -> Option<&'static Pattern> {
    let name = name.trim().to_ascii_lowercase();
    let name = ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| *target)
        .unwrap_or(name.as_str());
    PATTERNS.iter().find(|p| p.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PATTERNS.iter().map(|p| p.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_are_rectangular() {
        for pattern in PATTERNS {
            let width = pattern.width();
            assert!(
                pattern.rows.iter().all(|r| r.len() == width),
                "{} is ragged",
                pattern.name
            );
        }
    }

    #[test]
    fn test_find_with_aliases() {
        assert_eq!(find("Glider").unwrap().name, "glider");
        assert_eq!(find("static").unwrap().name, "beehive");
        assert_eq!(find("pentadecon").unwrap().name, "pentadecathlon");
        assert!(find("spaceship").is_none());
    }

    #[test]
    fn test_live_cell_counts() {
        assert_eq!(find("block").unwrap().live_cells().count(), 4);
        assert_eq!(find("glider").unwrap().live_cells().count(), 5);
        assert_eq!(find("pulsar").unwrap().live_cells().count(), 48);
        assert_eq!(find("gun").unwrap().live_cells().count(), 36);
        assert_eq!(find("heavyglider").unwrap().live_cells().count(), 13);
    }

    #[test]
    fn test_dimensions() {
        let gun = find("gun").unwrap();
        assert_eq!((gun.height(), gun.width()), (9, 36));
        assert_eq!(names().count(), 10);
    }
}
