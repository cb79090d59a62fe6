//! # py-window-limit
//!
//! `py-window-limit` a Python wrapper for `window-limit`.

mod python;

#[pyo3::prelude::pymodule]
fn py_window_limit(
    m: pyo3::prelude::Bound<'_, pyo3::prelude::PyModule>,
) -> pyo3::prelude::PyResult<()> {
    python::init_python_module(&m)?;
    Ok(())
}
