//! Integration tests for the composer
//!
//! Drive a full selection through prompt building, the text service,
//! formatting and playback using the fakes in `test_utils`.
