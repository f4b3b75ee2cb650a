pub mod ev;
pub mod quadrature;
