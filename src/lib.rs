//! A LS-8 program loader and simulator.
//! 
//! The LS-8 is a tiny educational 8-bit machine: 256 bytes of memory,
//! 8 general purpose registers (with `R7` doubling as the stack pointer),
//! and a handful of instructions for arithmetic, stack manipulation,
//! subroutines, and conditional branching.
//!
//! # Usage
//! 
//! LS-8 programs are written as text, one binary byte per line.
//! To run one, it must first be parsed into a [`Program`](parse::Program):
//! ```
//! use ls8_ensemble::parse::parse_program;
//! 
//! let src = "
//!     10000010 # LDI R0,8
//!     00000000
//!     00001000
//!     01000111 # PRN R0
//!     00000000
//!     00000001 # HLT
//! ";
//! let program = parse_program(src).unwrap();
//! assert_eq!(program.len(), 6);
//! ```
//! 
//! Once a program has been parsed, it can be executed with the simulator:
//! ```
//! # use ls8_ensemble::parse::parse_program;
//! # let src = "10000010\n00000000\n00001000\n01000111\n00000000\n00000001";
//! # let program = parse_program(src).unwrap();
//! use ls8_ensemble::sim::Simulator;
//! use ls8_ensemble::sim::device::BufferedDisplay;
//! 
//! let mut simulator = Simulator::new(Default::default());
//! let display = BufferedDisplay::default();
//! simulator.set_output(display.clone());
//! 
//! simulator.load_program(&program);
//! simulator.run().unwrap(); // <-- Result can be handled accordingly
//! assert_eq!(&*display.get_buffer().read().unwrap(), &[8]);
//! ```
//! 
//! If more granularity is needed for simulation, there are also step-in and step-out functions. 
//! See the [`sim`] module for more details.
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod sim;
pub mod err;
