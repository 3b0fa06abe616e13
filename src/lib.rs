mod allocator;

#[cfg(test)]
mod test_utils;

pub mod error;

pub use allocator::{Allocator, StdAllocator, UntypedAllocator};
pub use placealloc_source as source;

pub mod prelude {
    pub use crate::allocator::{Allocator, StdAllocator, UntypedAllocator};
    pub use crate::error::{Error, Result};
    pub use placealloc_source::prelude::*;
}
