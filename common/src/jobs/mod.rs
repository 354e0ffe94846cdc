use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a carousel as a whole.
///
/// `Pending -> Generating -> Completed | Error`. A carousel may be generated
/// again once it reached a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarouselStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl CarouselStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarouselStatus::Pending => "pending",
            CarouselStatus::Generating => "generating",
            CarouselStatus::Completed => "completed",
            CarouselStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CarouselStatus::Completed | CarouselStatus::Error)
    }
}

impl FromStr for CarouselStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // Older rows were written as `created`.
            "pending" | "created" => Ok(CarouselStatus::Pending),
            "generating" => Ok(CarouselStatus::Generating),
            "completed" => Ok(CarouselStatus::Completed),
            "error" => Ok(CarouselStatus::Error),
            other => Err(format!("unknown carousel status '{}'", other)),
        }
    }
}

impl fmt::Display for CarouselStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single slide: `Pending -> Completed | Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideStatus {
    Pending,
    Completed,
    Error,
}

impl SlideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideStatus::Pending => "pending",
            SlideStatus::Completed => "completed",
            SlideStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SlideStatus::Pending)
    }
}

impl FromStr for SlideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SlideStatus::Pending),
            "completed" => Ok(SlideStatus::Completed),
            "error" => Ok(SlideStatus::Error),
            other => Err(format!("unknown slide status '{}'", other)),
        }
    }
}

impl fmt::Display for SlideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of slides that reached a terminal state out of the total.
///
/// `done` only ever grows while a batch is in flight, so pollers can use it
/// as a progress bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub done: u32,
    pub total: u32,
}
