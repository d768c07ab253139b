pub mod fine;
