//! Filters for common SVG elements

use crate::filter::{tag_is, Filter};

pub fn is_svg() -> Filter {
    tag_is("svg")
}

pub fn is_g() -> Filter {
    tag_is("g")
}

pub fn is_rect() -> Filter {
    tag_is("rect")
}

pub fn is_circle() -> Filter {
    tag_is("circle")
}

pub fn is_path() -> Filter {
    tag_is("path")
}

pub fn is_text() -> Filter {
    tag_is("text")
}

pub fn is_tspan() -> Filter {
    tag_is("tspan")
}

/// Same as [`filter::image`](crate::filter::image)
pub fn is_image() -> Filter {
    crate::filter::image()
}

pub fn is_defs() -> Filter {
    tag_is("defs")
}
