pub mod black_scholes;
pub mod implied_vol;
pub mod probability;

use statrs::distribution::Normal;

/// Days per year used for every day-count conversion in the engine.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Lognormal model inputs with the shared d1 terms precomputed.
/// Stack-allocated, Copy. Used by the valuation, probability and density code
/// so d1 is written exactly once.
#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub rate: f64,
    // Precomputed
    pub ln_s_k: f64,
    pub sigma_sqrt_t: f64,
    pub half_sigma_sq: f64,
}

impl ModelParams {
    #[inline]
    pub fn new(spot: f64, strike: f64, ttl_years: f64, rate: f64, sigma: f64) -> Self {
        let ln_s_k = (spot / strike).ln();
        let sigma_sqrt_t = sigma * ttl_years.max(0.0).sqrt();
        let half_sigma_sq = 0.5 * sigma * sigma;
        Self {
            spot,
            strike,
            ttl_years,
            rate,
            ln_s_k,
            sigma_sqrt_t,
            half_sigma_sq,
        }
    }

    /// d1 = (ln(S/K) + (r + sigma^2/2) * t) / (sigma * sqrt(t))
    #[inline]
    pub fn d1(&self) -> f64 {
        (self.ln_s_k + (self.rate + self.half_sigma_sq) * self.ttl_years) / self.sigma_sqrt_t
    }

    /// d2 = d1 - sigma * sqrt(t)
    #[inline]
    pub fn d2(&self) -> f64 {
        self.d1() - self.sigma_sqrt_t
    }

    /// True when there is no diffusion left and the intrinsic branch applies.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.ttl_years <= 0.0 || self.sigma_sqrt_t < 1e-12
    }
}

/// Standard normal N(0, 1).
#[inline]
pub fn standard_normal() -> Normal {
    // Normal::new(0, 1) only fails if std_dev <= 0.
    Normal::new(0.0, 1.0).unwrap_or(Normal::standard())
}
