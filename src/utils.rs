use wasm_bindgen::prelude::*;
use std::sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}};


#[macro_export]
macro_rules! log {
    ( $( $t:tt )* ) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::log_1(&format!( $( $t )* ).into());
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!( $( $t )* );
    }}
}


#[wasm_bindgen(module = "/helper.js")]
extern "C" {
    pub fn get_canvas_width() -> u32;
    pub fn get_canvas_height() -> u32;
}


/// Milliseconds since the epoch, from the host's clock
#[inline(always)]
pub fn get_time_milliseconds() -> f64 {
    js_sys::Date::now()
}


/// Enable better error messages if our code ever panics
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}


/// Sets error flag and message for an egui window
#[inline(always)]
pub fn set_error_for_egui(flag: &Arc<AtomicBool>, msg: &Arc<Mutex<String>>, s: String) {
    log!("{}", s);
    flag.store(true, Ordering::Relaxed);
    if let Ok(mut mutex) = msg.lock() {
        if !mutex.is_empty() {
            *mutex += "\n";
        }
        *mutex += s.as_str();
    }
}


/// Check if a float is zero
#[inline(always)]
pub fn is_float_zero(x: f32, threshold: f32) -> bool {
    x.abs() < threshold
}


/// Check if two floats are equal
#[inline(always)]
pub fn are_floats_equal(x: f32, y: f32, threshold: f32) -> bool {
    is_float_zero(x-y, threshold)
}


/// Incremental moving average over the last `window` samples
pub struct IncrementalMA {
    samples: Vec<f64>,
    window: usize,
    next: usize,
    sum: f64,
}
impl IncrementalMA {
    pub fn new(window: usize) -> Self {
        Self {
            samples: Vec::with_capacity(window.max(1)),
            window: window.max(1),
            next: 0,
            sum: 0.0,
        }
    }

    /// Adds a sample and returns the current average
    pub fn add(&mut self, x: f64) -> f64 {
        if !x.is_finite() {
            return self.average();
        }
        if self.samples.len() < self.window {
            self.samples.push(x);
        } else {
            self.sum -= self.samples[self.next];
            self.samples[self.next] = x;
        }
        self.next = (self.next + 1) % self.window;
        self.sum += x;
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_comparisons() {
        assert!(is_float_zero(1e-7, 1e-6));
        assert!(!is_float_zero(-0.1, 1e-6));
        assert!(are_floats_equal(0.3, 0.1 + 0.2, 1e-6));
    }

    #[test]
    fn moving_average_drops_old_samples() {
        let mut ma = IncrementalMA::new(2);
        assert_eq!(ma.add(2.0), 2.0);
        assert_eq!(ma.add(4.0), 3.0);
        assert_eq!(ma.add(6.0), 5.0);
        // infinite frame rate on the first frame is ignored
        assert_eq!(ma.add(f64::INFINITY), 5.0);
    }

    #[test]
    fn error_message_accumulates() {
        let flag = Arc::new(AtomicBool::new(false));
        let msg = Arc::new(Mutex::new(String::new()));
        set_error_for_egui(&flag, &msg, "first".to_string());
        set_error_for_egui(&flag, &msg, "second".to_string());
        assert!(flag.load(Ordering::Relaxed));
        assert_eq!(*msg.lock().unwrap(), "first\nsecond");
    }
}
