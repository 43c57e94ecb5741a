mod common;
mod qualification;
