pub mod options_chain;
