//! Resolution of input arguments into conversion jobs

mod planner;
mod resolver;

pub use planner::{converted_name, ConversionJob, ConversionPlan, PathPlanner};
pub use resolver::{
    classify, is_converted_name, is_package_name, scan_packages, PathKind, CONVERTED_EXTENSION,
    PACKAGE_EXTENSION,
};
