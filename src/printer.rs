// MIT License
//
// Copyright (c) 2023 Astral Software Inc.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use anstream::{eprint, print};
use indicatif::ProgressDrawTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Printer {
    /// Print to the standard streams, with progress spinners.
    Default,
    /// Suppress all output.
    Quiet,
    /// Print everything; progress spinners are hidden so they don't interleave with debug logs.
    Verbose,
    /// Print to the standard streams, without progress spinners.
    NoProgress,
}

impl Printer {
    /// Return the [`ProgressDrawTarget`] for this printer.
    pub fn target(self) -> ProgressDrawTarget {
        match self {
            Self::Default => ProgressDrawTarget::stderr(),
            Self::Quiet | Self::Verbose | Self::NoProgress => ProgressDrawTarget::hidden(),
        }
    }

    pub fn stdout(self) -> Stream {
        match self {
            Self::Quiet => Stream::Disabled,
            _ => Stream::Stdout,
        }
    }

    pub fn stderr(self) -> Stream {
        match self {
            Self::Quiet => Stream::Disabled,
            _ => Stream::Stderr,
        }
    }
}

/// An output stream that honors the printer's verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
    Disabled,
}

impl std::fmt::Write for Stream {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        #[allow(clippy::print_stdout, clippy::print_stderr)]
        match self {
            Self::Stdout => print!("{s}"),
            Self::Stderr => eprint!("{s}"),
            Self::Disabled => {}
        }
        Ok(())
    }
}
