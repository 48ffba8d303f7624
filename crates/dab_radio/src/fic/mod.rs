pub mod fic_decoder;
