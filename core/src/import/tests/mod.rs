//! Importer scenario tests over hand-built source scenes.

mod fixtures;
