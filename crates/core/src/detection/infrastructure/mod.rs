pub mod cascade_face_detector;
pub mod haar_cascade;
pub mod integral_image;
pub mod rect_grouping;
