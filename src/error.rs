#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Exhausted: cannot reserve {count} elements of {elem_size} bytes")]
    Exhausted { count: usize, elem_size: usize },
}

impl Error {
    pub(crate) fn exhausted<T>(count: usize) -> Self {
        Error::Exhausted {
            count,
            elem_size: std::mem::size_of::<T>(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
