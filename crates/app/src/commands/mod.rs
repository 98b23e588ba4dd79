pub mod departments;
pub mod rounds;
pub mod run;
