pub mod er_canvas;
