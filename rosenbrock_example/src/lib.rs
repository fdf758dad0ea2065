pub mod rosenbrock;

pub mod prelude {
    pub use crate::rosenbrock::{Rosenbrock, ensemble_rosenbrock};
}

pub use crate::prelude::*;
