mod list;
mod sequence;

pub mod prelude {
    pub use crate::list::{LinkedList, ListIter};
    pub use crate::sequence::Sequence;
}
