pub mod path;
pub mod signup;
