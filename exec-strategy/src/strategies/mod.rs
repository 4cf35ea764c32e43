pub mod breakout;
pub mod mean_reversion;
pub mod momentum;
