// SPDX-License-Identifier: MIT
//
// pport-term — terminal engine for the pport chat client.
//
// Everything between the raw keyboard and the painted screen lives here:
// a one-event-per-chunk key decoder, ANSI-safe string measuring and
// clipping, a line-oriented screen buffer with a differential renderer
// that supports a bottom-anchored layout, small periodic togglers for
// the cursor and spinner, a deterministic scheduler, and the raw-mode
// terminal plumbing that ties them into one event loop.
//
// No TUI framework sits underneath. Output is plain ANSI written in one
// batch per frame, and rows that did not change are never touched.

pub mod ansi;
pub mod buffer;
pub mod diff;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod reader;
pub mod schedule;
pub mod terminal;
pub mod text;
pub mod toggle;
