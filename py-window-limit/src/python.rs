use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use window_limit::RateLimiter;
use window_limit::Strategy;

/// Lock-free fixed window rate limiter.
#[pyclass(name = "RateLimiter")]
struct PyRateLimiter(RateLimiter);

#[pymethods]
impl PyRateLimiter {
    #[new]
    fn new(capacity: u32) -> PyResult<Self> {
        RateLimiter::new(capacity)
            .map(PyRateLimiter)
            .map_err(|err| PyValueError::new_err(err.to_string()))
    }

    /// Returns how many of `tokens` were granted in the current window.
    #[pyo3(signature = (tokens = 1))]
    fn try_acquire(&self, tokens: u32) -> u32 {
        self.0.try_acquire(tokens)
    }

    fn process(&self) -> bool {
        self.0.process().is_continue()
    }

    fn remaining(&self) -> u32 {
        self.0.remaining()
    }

    fn retry_after_ms(&self) -> u64 {
        self.0.retry_after().as_millis() as u64
    }

    #[getter]
    fn capacity(&self) -> u32 {
        self.0.capacity()
    }

    fn __repr__(&self) -> String {
        format!("RateLimiter(capacity={})", self.0.capacity())
    }
}

pub fn init_python_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyRateLimiter>()?;
    m.add("MAX_CAPACITY", window_limit::MAX_CAPACITY)?;
    m.add("WINDOW_MS", window_limit::WINDOW_MS)?;
    Ok(())
}
