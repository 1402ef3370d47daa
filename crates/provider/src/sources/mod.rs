pub mod chesscom;
