//! Renderers fed with a snapshot after every tick
//!
//! Renderers only ever see a [`RenderSnapshot`], never the world itself, so
//! they have no way to influence the simulation.

use std::collections::VecDeque;
use std::io::{self, Write};

use log::info;

use crate::simulation::{Direction, Heading, LaneId, LanePlacement, SignalColor};

/// A car as a renderer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarSnapshot {
    pub lane: LaneId,
    pub placement: Option<LanePlacement>,
    pub position: u32,
    pub lane_length: u32,
}

/// Read-only picture of the world at the end of a tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSnapshot {
    pub tick: u64,
    /// Color of the stop light facing each inbound direction
    pub signals: Vec<(Direction, SignalColor)>,
    pub cars: Vec<CarSnapshot>,
    /// Live cars, including those parked inside nodes
    pub volume: usize,
}

pub trait Renderer: Send {
    fn render(&mut self, snapshot: &RenderSnapshot);
}

/// Renderer that draws nothing
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &RenderSnapshot) {}
}

/// Headless renderer: logs a one-line status every `every` ticks
#[derive(Debug)]
pub struct LogRenderer {
    every: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, snapshot: &RenderSnapshot) {
        if snapshot.tick % self.every != 0 {
            return;
        }
        let signals: Vec<String> = snapshot
            .signals
            .iter()
            .map(|(direction, color)| format!("{:?}={}", direction, color))
            .collect();
        info!(
            "Tick {}: {} cars ({} on lanes), signals [{}]",
            snapshot.tick,
            snapshot.volume,
            snapshot.cars.len(),
            signals.join(", ")
        );
    }
}

// ── Terminal drawing ──────────────────────────────────────────────────

const VERT_LANE_HEIGHT: i32 = 15;
const HORIZ_LANE_LENGTH: i32 = 22;
const VERT_OFFSET: i32 = 5;
const HORIZ_OFFSET: i32 = 17;
const INTERSECTION_HEIGHT: i32 = 4;
const INTERSECTION_WIDTH: i32 = 5;

/// Samples kept by the volume chart
pub const VOLUME_HISTORY: usize = 19;

const SCREEN_WIDTH: usize = 72;
const SCREEN_HEIGHT: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Plain,
    Red,
    Yellow,
    Green,
    Blue,
}

impl Color {
    fn ansi(self) -> &'static str {
        match self {
            Color::Plain => "\x1b[0m",
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::Green => "\x1b[32m",
            Color::Blue => "\x1b[34m",
        }
    }
}

impl From<SignalColor> for Color {
    fn from(color: SignalColor) -> Self {
        match color {
            SignalColor::Red => Color::Red,
            SignalColor::Yellow => Color::Yellow,
            SignalColor::Green => Color::Green,
        }
    }
}

/// Character grid addressed with 1-based (column, row) like a terminal cursor
#[derive(Debug, Clone)]
pub struct Frame {
    cells: Vec<Vec<(char, Color)>>,
}

impl Frame {
    fn new() -> Self {
        Self {
            cells: vec![vec![(' ', Color::Plain); SCREEN_WIDTH]; SCREEN_HEIGHT],
        }
    }

    fn put(&mut self, col: i32, row: i32, text: &str, color: Color) {
        if row < 1 || col < 1 {
            return;
        }
        let Some(line) = self.cells.get_mut(row as usize - 1) else {
            return;
        };
        for (offset, ch) in text.chars().enumerate() {
            if let Some(cell) = line.get_mut(col as usize - 1 + offset) {
                *cell = (ch, color);
            }
        }
    }

    /// Character at a 1-based (column, row)
    pub fn char_at(&self, col: i32, row: i32) -> Option<char> {
        if row < 1 || col < 1 {
            return None;
        }
        self.cells
            .get(row as usize - 1)?
            .get(col as usize - 1)
            .map(|(ch, _)| *ch)
    }

    /// Frame as plain text, one line per row
    pub fn to_plain_string(&self) -> String {
        self.cells
            .iter()
            .map(|line| line.iter().map(|(ch, _)| *ch).collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_ansi_string(&self) -> String {
        let mut out = String::from("\x1b[1;1H");
        for line in &self.cells {
            let mut current = Color::Plain;
            out.push_str(current.ansi());
            for (ch, color) in line {
                if *color != current {
                    current = *color;
                    out.push_str(current.ansi());
                }
                out.push(*ch);
            }
            out.push_str(Color::Plain.ansi());
            out.push('\n');
        }
        out
    }
}

/// Screen cell for a car `position` along a lane of `lane_length` drawn at
/// `placement`
fn car_cell(placement: LanePlacement, position: u32, lane_length: u32) -> (i32, i32) {
    let length = lane_length.max(1) as i32;
    let position = position as i32;
    let vertical = position * (VERT_LANE_HEIGHT - 1) / length;
    let horizontal = position * (HORIZ_LANE_LENGTH - 1) / length;

    match (placement.heading, placement.direction) {
        (Heading::Inbound, Direction::North) => (40, vertical + VERT_OFFSET),
        (Heading::Inbound, Direction::West) => (horizontal + HORIZ_OFFSET, 22),
        (Heading::Inbound, Direction::South) => (
            42,
            VERT_OFFSET + INTERSECTION_HEIGHT + VERT_LANE_HEIGHT * 2 - vertical - 1,
        ),
        (Heading::Inbound, Direction::East) => (
            HORIZ_OFFSET + INTERSECTION_WIDTH + HORIZ_LANE_LENGTH * 2 - horizontal - 1,
            21,
        ),
        (Heading::Outbound, Direction::North) => (42, VERT_OFFSET + VERT_LANE_HEIGHT - vertical - 1),
        (Heading::Outbound, Direction::West) => (HORIZ_OFFSET + HORIZ_LANE_LENGTH - horizontal - 1, 21),
        (Heading::Outbound, Direction::South) => (
            40,
            vertical + VERT_OFFSET + VERT_LANE_HEIGHT + INTERSECTION_HEIGHT,
        ),
        (Heading::Outbound, Direction::East) => (
            horizontal + HORIZ_OFFSET + HORIZ_LANE_LENGTH + INTERSECTION_WIDTH,
            22,
        ),
    }
}

/// ANSI terminal renderer: the four approaches, their stop lights, the cars
/// and a rolling traffic-volume chart
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    history: VecDeque<usize>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the screen and hide the cursor
    pub fn init() {
        print!("\x1b[2J\x1b[1;1H\x1b[0m\x1b[?25l");
        let _ = io::stdout().flush();
    }

    /// Show the cursor again
    pub fn restore() {
        print!("\x1b[0m\x1b[?25h\n");
        let _ = io::stdout().flush();
    }

    pub fn history(&self) -> &VecDeque<usize> {
        &self.history
    }

    fn record_volume(&mut self, volume: usize) {
        self.history.push_back(volume);
        if self.history.len() > VOLUME_HISTORY {
            self.history.pop_front();
        }
    }

    /// Draw a snapshot into a frame without touching the terminal
    pub fn draw(&mut self, snapshot: &RenderSnapshot) -> Frame {
        let mut frame = Frame::new();
        draw_lanes(&mut frame);

        for (direction, color) in &snapshot.signals {
            draw_stop_light(&mut frame, *direction, (*color).into());
        }

        for car in &snapshot.cars {
            if let Some(placement) = car.placement {
                let (col, row) = car_cell(placement, car.position, car.lane_length);
                frame.put(col, row, "O", Color::Blue);
            }
        }

        self.record_volume(snapshot.volume);
        self.draw_volume_graph(&mut frame);
        frame
    }

    fn draw_volume_graph(&self, frame: &mut Frame) {
        for row in 3..18 {
            frame.put(10, row, "|", Color::Plain);
        }
        frame.put(10, 18, "--------------------", Color::Plain);
        frame.put(12, 19, "Traffic volume", Color::Plain);

        for (col, volume) in (11..).zip(self.history.iter()) {
            let row = 17 - (*volume as i32) / 10;
            if row < 3 {
                frame.put(col, 3, "-", Color::Red);
            } else {
                frame.put(col, row, "-", Color::Plain);
            }
        }
    }
}

fn draw_lanes(frame: &mut Frame) {
    for i in 0..VERT_LANE_HEIGHT {
        let lower = i + VERT_OFFSET + VERT_LANE_HEIGHT + INTERSECTION_HEIGHT;
        frame.put(40, i + VERT_OFFSET, "|", Color::Plain);
        frame.put(42, i + VERT_OFFSET, "|", Color::Plain);
        frame.put(40, lower, "|", Color::Plain);
        frame.put(42, lower, "|", Color::Plain);
    }

    for i in 0..HORIZ_LANE_LENGTH {
        let right = i + HORIZ_OFFSET + HORIZ_LANE_LENGTH + INTERSECTION_WIDTH;
        frame.put(i + HORIZ_OFFSET, 21, "-", Color::Plain);
        frame.put(i + HORIZ_OFFSET, 22, "-", Color::Plain);
        frame.put(right, 21, "-", Color::Plain);
        frame.put(right, 22, "-", Color::Plain);
    }
}

fn draw_stop_light(frame: &mut Frame, direction: Direction, color: Color) {
    match direction {
        Direction::North => frame.put(40, 20, "---", color),
        Direction::West => {
            frame.put(39, 21, "|", color);
            frame.put(39, 22, "|", color);
        }
        Direction::East => {
            frame.put(43, 21, "|", color);
            frame.put(43, 22, "|", color);
        }
        Direction::South => frame.put(40, 23, "---", color),
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, snapshot: &RenderSnapshot) {
        let frame = self.draw(snapshot);
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(frame.to_ansi_string().as_bytes());
        let _ = stdout.flush();
    }
}
