// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case orchestrates the other layers to accomplish
// one command of the CLI:
//
//   train_use_case  : train, evaluate and save the classifier
//   infer_use_case  : classify one image with the saved model
//   find_lr_use_case: learning-rate sweep and its plot
//
// No ML math here and no argument parsing; only workflow
// coordination and the configs that drive it.

pub mod train_use_case;

pub mod infer_use_case;

pub mod find_lr_use_case;
